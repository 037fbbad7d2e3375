//! In-memory [`GraphStore`] keyed by entity id.
//!
//! Concurrent maps allow the parallel load strategy to upsert slices of one
//! phase at the same time. Entity maps enforce id uniqueness; relationship
//! maps are keyed by `(kind, from, to)` so each ordered pair holds at most one
//! relationship of a kind.

use std::{
    io::Write,
    sync::atomic::{AtomicUsize, Ordering},
};

use dashmap::{DashMap, DashSet};
use serde::Serialize;
use tracing::{instrument, trace};

use crate::{
    edges::{ReasonTag, SharedEdge},
    entity::{EntityId, EntityKind, Transaction, User},
};

use super::{GraphStore, RelationshipKind, StoreResult};

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
struct RelationshipKey {
    kind: RelationshipKind,
    from: EntityId,
    to: EntityId,
}

/// Reference store holding everything in process memory.
///
/// # Examples
/// ```
/// use fraudnet_core::{GraphStore, MemoryGraphStore, User};
///
/// let store = MemoryGraphStore::new();
/// let user = User {
///     id: "u_0".into(),
///     name: "User0".into(),
///     email: "user0@example.com".into(),
///     phone: "+1-555-0000000".into(),
///     address: "Address 0".into(),
///     payment_methods: "credit_card".into(),
/// };
/// store.upsert_users(&[user.clone()])?;
/// store.upsert_users(&[user])?;
/// assert_eq!(store.user_count(), 1);
/// # Ok::<(), fraudnet_core::StoreError>(())
/// ```
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    users: DashMap<EntityId, User>,
    transactions: DashMap<EntityId, Transaction>,
    relationships: DashMap<RelationshipKey, Vec<ReasonTag>>,
    debits: DashSet<(EntityId, EntityId)>,
    credits: DashSet<(EntityId, EntityId)>,
    operations: AtomicUsize,
    skipped: AtomicUsize,
}

impl MemoryGraphStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Number of stored transactions.
    #[must_use]
    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    /// Looks up a user by id.
    #[must_use]
    pub fn user(&self, id: &str) -> Option<User> {
        self.users.get(id).map(|entry| entry.value().clone())
    }

    /// Looks up a transaction by id.
    #[must_use]
    pub fn transaction(&self, id: &str) -> Option<Transaction> {
        self.transactions.get(id).map(|entry| entry.value().clone())
    }

    /// Number of directed relationships of `kind`.
    #[must_use]
    pub fn relationship_count(&self, kind: RelationshipKind) -> usize {
        self.relationships
            .iter()
            .filter(|entry| entry.key().kind == kind)
            .count()
    }

    /// Reasons carried by the directed relationship `from -> to`, if present.
    #[must_use]
    pub fn relationship(
        &self,
        kind: RelationshipKind,
        from: &str,
        to: &str,
    ) -> Option<Vec<ReasonTag>> {
        let key = RelationshipKey {
            kind,
            from: EntityId::from(from),
            to: EntityId::from(to),
        };
        self.relationships.get(&key).map(|entry| entry.value().clone())
    }

    /// Number of `DEBIT` relationships.
    #[must_use]
    pub fn debit_count(&self) -> usize {
        self.debits.len()
    }

    /// Number of `CREDIT` relationships.
    #[must_use]
    pub fn credit_count(&self) -> usize {
        self.credits.len()
    }

    /// Whether `user` debits `transaction`.
    #[must_use]
    pub fn has_debit(&self, user: &str, transaction: &str) -> bool {
        self.debits
            .contains(&(EntityId::from(user), EntityId::from(transaction)))
    }

    /// Whether `transaction` credits `user`.
    #[must_use]
    pub fn has_credit(&self, transaction: &str, user: &str) -> bool {
        self.credits
            .contains(&(EntityId::from(transaction), EntityId::from(user)))
    }

    /// Number of bulk operations served so far.
    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.operations.load(Ordering::Relaxed)
    }

    /// Number of relationships skipped because an endpoint was missing.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Ids of the users whose attribute named by `reason` equals `value`,
    /// sorted. Tags that do not name a user attribute match nothing.
    #[must_use]
    pub fn users_with_attribute(&self, reason: ReasonTag, value: &str) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self
            .users
            .iter()
            .filter(|entry| user_attribute(entry.value(), reason) == Some(value))
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Ids of the transactions whose `ip` or `deviceId` equals `value`,
    /// sorted. Other tags match nothing.
    #[must_use]
    pub fn transactions_with_attribute(&self, reason: ReasonTag, value: &str) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self
            .transactions
            .iter()
            .filter(|entry| transaction_attribute(entry.value(), reason) == Some(value))
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Captures a deterministic, serialisable copy of the store contents.
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        let mut users: Vec<User> = self.users.iter().map(|e| e.value().clone()).collect();
        users.sort_unstable_by(|a, b| a.id.cmp(&b.id));
        let mut transactions: Vec<Transaction> = self
            .transactions
            .iter()
            .map(|e| e.value().clone())
            .collect();
        transactions.sort_unstable_by(|a, b| a.id.cmp(&b.id));
        let mut relationships: Vec<RelationshipRecord> = self
            .relationships
            .iter()
            .map(|entry| RelationshipRecord {
                kind: entry.key().kind,
                from: entry.key().from.clone(),
                to: entry.key().to.clone(),
                reasons: entry.value().clone(),
            })
            .collect();
        relationships.sort_unstable_by(|a, b| {
            (a.kind, &a.from, &a.to).cmp(&(b.kind, &b.from, &b.to))
        });
        StoreSnapshot {
            users,
            transactions,
            relationships,
            debits: collect_links(&self.debits),
            credits: collect_links(&self.credits),
        }
    }

    /// Writes [`Self::snapshot`] to `writer` as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns [`serde_json::Error`] when serialisation or the write fails.
    pub fn write_snapshot<W: Write>(&self, writer: W) -> Result<(), serde_json::Error> {
        serde_json::to_writer_pretty(writer, &self.snapshot())
    }

    fn begin_operation(&self) {
        self.operations.fetch_add(1, Ordering::Relaxed);
    }

    fn skip(&self, what: &'static str, from: &EntityId, to: &EntityId) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
        trace!(relationship = what, %from, %to, "endpoint missing, relationship skipped");
    }

    fn contains(&self, kind: EntityKind, id: &EntityId) -> bool {
        match kind {
            EntityKind::User => self.users.contains_key(id),
            EntityKind::Transaction => self.transactions.contains_key(id),
        }
    }
}

impl GraphStore for MemoryGraphStore {
    #[instrument(level = "trace", skip_all, fields(rows = users.len()))]
    fn upsert_users(&self, users: &[User]) -> StoreResult<()> {
        self.begin_operation();
        for user in users {
            self.users.insert(user.id.clone(), user.clone());
        }
        Ok(())
    }

    #[instrument(level = "trace", skip_all, fields(rows = transactions.len()))]
    fn upsert_transactions(&self, transactions: &[Transaction]) -> StoreResult<()> {
        self.begin_operation();
        for transaction in transactions {
            self.transactions
                .insert(transaction.id.clone(), transaction.clone());
        }
        Ok(())
    }

    #[instrument(level = "trace", skip_all, fields(rows = transactions.len()))]
    fn link_debits(&self, transactions: &[Transaction]) -> StoreResult<()> {
        self.begin_operation();
        for transaction in transactions {
            let user = &transaction.sender_id;
            if self.contains(EntityKind::User, user)
                && self.contains(EntityKind::Transaction, &transaction.id)
            {
                self.debits.insert((user.clone(), transaction.id.clone()));
            } else {
                self.skip("DEBIT", user, &transaction.id);
            }
        }
        Ok(())
    }

    #[instrument(level = "trace", skip_all, fields(rows = transactions.len()))]
    fn link_credits(&self, transactions: &[Transaction]) -> StoreResult<()> {
        self.begin_operation();
        for transaction in transactions {
            let user = &transaction.receiver_id;
            if self.contains(EntityKind::User, user)
                && self.contains(EntityKind::Transaction, &transaction.id)
            {
                self.credits.insert((transaction.id.clone(), user.clone()));
            } else {
                self.skip("CREDIT", &transaction.id, user);
            }
        }
        Ok(())
    }

    #[instrument(level = "trace", skip_all, fields(kind = %kind, rows = edges.len()))]
    fn upsert_relationships(
        &self,
        kind: RelationshipKind,
        edges: &[SharedEdge],
    ) -> StoreResult<()> {
        self.begin_operation();
        let endpoint = kind.endpoint();
        for edge in edges {
            let (source, target) = (edge.source(), edge.target());
            if !(self.contains(endpoint, source) && self.contains(endpoint, target)) {
                self.skip(kind.as_str(), source, target);
                continue;
            }
            for (from, to) in [(source, target), (target, source)] {
                self.relationships.insert(
                    RelationshipKey {
                        kind,
                        from: from.clone(),
                        to: to.clone(),
                    },
                    edge.reasons().to_vec(),
                );
            }
        }
        Ok(())
    }
}

fn user_attribute(user: &User, reason: ReasonTag) -> Option<&str> {
    match reason {
        ReasonTag::Email => Some(&user.email),
        ReasonTag::Phone => Some(&user.phone),
        ReasonTag::Address => Some(&user.address),
        ReasonTag::PaymentMethods => Some(&user.payment_methods),
        _ => None,
    }
}

fn transaction_attribute(transaction: &Transaction, reason: ReasonTag) -> Option<&str> {
    match reason {
        ReasonTag::Ip => Some(&transaction.ip),
        ReasonTag::DeviceId => Some(&transaction.device_id),
        _ => None,
    }
}

fn collect_links(links: &DashSet<(EntityId, EntityId)>) -> Vec<LinkRecord> {
    let mut records: Vec<LinkRecord> = links
        .iter()
        .map(|entry| LinkRecord {
            from: entry.key().0.clone(),
            to: entry.key().1.clone(),
        })
        .collect();
    records.sort_unstable_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));
    records
}

/// Deterministic copy of a [`MemoryGraphStore`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StoreSnapshot {
    /// Users sorted by id.
    pub users: Vec<User>,
    /// Transactions sorted by id.
    pub transactions: Vec<Transaction>,
    /// Directed relationships sorted by `(kind, from, to)`.
    pub relationships: Vec<RelationshipRecord>,
    /// `DEBIT` relationships (user to transaction) sorted by endpoints.
    pub debits: Vec<LinkRecord>,
    /// `CREDIT` relationships (transaction to user) sorted by endpoints.
    pub credits: Vec<LinkRecord>,
}

/// One directed sharing relationship.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RelationshipRecord {
    /// Relationship type.
    pub kind: RelationshipKind,
    /// Start node.
    pub from: EntityId,
    /// End node.
    pub to: EntityId,
    /// Reasons set on the relationship.
    pub reasons: Vec<ReasonTag>,
}

/// One directed debit or credit relationship.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LinkRecord {
    /// Start node.
    pub from: EntityId,
    /// End node.
    pub to: EntityId,
}
