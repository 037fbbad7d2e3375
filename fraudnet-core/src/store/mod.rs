//! Graph store abstraction consumed by the batch loader.
//!
//! Every method is one bulk operation and must behave as an idempotent merge:
//! replaying a batch overwrites attributes and never duplicates entities or
//! relationships. Relationship endpoints that do not resolve are skipped,
//! matching merge-after-match semantics.

mod memory;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    edges::SharedEdge,
    entity::{EntityKind, Transaction, User},
    error::StoreError,
};

pub use self::memory::{LinkRecord, MemoryGraphStore, RelationshipRecord, StoreSnapshot};

/// Result alias for store operations.
pub type StoreResult<T> = core::result::Result<T, StoreError>;

/// Directed relationship kinds materialised from undirected sharing edges.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub enum RelationshipKind {
    /// User to user, created from user attribute sharing.
    #[serde(rename = "SHARED_ATTRIBUTE")]
    SharedAttribute,
    /// Transaction to transaction, created from IP or device sharing.
    #[serde(rename = "RELATED_TO")]
    RelatedTo,
}

impl RelationshipKind {
    /// Store relationship type name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SharedAttribute => "SHARED_ATTRIBUTE",
            Self::RelatedTo => "RELATED_TO",
        }
    }

    /// Entity kind found at both endpoints.
    #[must_use]
    pub const fn endpoint(self) -> EntityKind {
        match self {
            Self::SharedAttribute => EntityKind::User,
            Self::RelatedTo => EntityKind::Transaction,
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bulk upsert capability of the target graph store.
///
/// # Examples
/// ```
/// use std::sync::Mutex;
///
/// use fraudnet_core::{GraphStore, RelationshipKind, SharedEdge, StoreResult, Transaction, User};
///
/// #[derive(Default)]
/// struct Counting(Mutex<usize>);
///
/// impl Counting {
///     fn bump(&self, rows: usize) -> StoreResult<()> {
///         *self.0.lock().expect("lock") += rows;
///         Ok(())
///     }
/// }
///
/// impl GraphStore for Counting {
///     fn upsert_users(&self, users: &[User]) -> StoreResult<()> { self.bump(users.len()) }
///     fn upsert_transactions(&self, txs: &[Transaction]) -> StoreResult<()> { self.bump(txs.len()) }
///     fn link_debits(&self, txs: &[Transaction]) -> StoreResult<()> { self.bump(txs.len()) }
///     fn link_credits(&self, txs: &[Transaction]) -> StoreResult<()> { self.bump(txs.len()) }
///     fn upsert_relationships(&self, _: RelationshipKind, edges: &[SharedEdge]) -> StoreResult<()> {
///         self.bump(edges.len())
///     }
/// }
///
/// let store = Counting::default();
/// store.upsert_users(&[])?;
/// assert_eq!(*store.0.lock().expect("lock"), 0);
/// # Ok::<(), fraudnet_core::StoreError>(())
/// ```
pub trait GraphStore {
    /// Merges users by id and sets every attribute.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the store fails the whole batch.
    fn upsert_users(&self, users: &[User]) -> StoreResult<()>;

    /// Merges transactions by id and sets amount, IP and device id.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the store fails the whole batch.
    fn upsert_transactions(&self, transactions: &[Transaction]) -> StoreResult<()>;

    /// Merges a `DEBIT` relationship from each sender to its transaction.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the store fails the whole batch.
    fn link_debits(&self, transactions: &[Transaction]) -> StoreResult<()>;

    /// Merges a `CREDIT` relationship from each transaction to its receiver.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the store fails the whole batch.
    fn link_credits(&self, transactions: &[Transaction]) -> StoreResult<()>;

    /// Merges both directed relationships of `kind` for every edge and sets
    /// the edge's reasons on each.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the store fails the whole batch.
    fn upsert_relationships(&self, kind: RelationshipKind, edges: &[SharedEdge])
    -> StoreResult<()>;
}
