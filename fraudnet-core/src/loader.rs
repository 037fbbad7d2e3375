//! Batched upload of a synthetic dataset into a [`GraphStore`].
//!
//! Phases run in a fixed order and never interleave: users, user sharing
//! edges, transactions with their debit and credit links, then transaction
//! sharing edges. Each phase slices its records into batches of at most
//! `batch_size`; the first failing batch aborts the load.

use std::{fmt, num::NonZeroUsize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::{
    error::{GenerationError, Result},
    generator::SyntheticDataset,
    store::{GraphStore, RelationshipKind, StoreResult},
};

/// Default number of records per bulk operation.
pub const DEFAULT_BATCH_SIZE: usize = 5_000;

/// Ordered stages of a load.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum LoadPhase {
    /// User nodes.
    Users,
    /// `SHARED_ATTRIBUTE` relationships between users.
    SharedEdges,
    /// Transaction nodes followed by their `DEBIT` and `CREDIT` links.
    Transactions,
    /// `RELATED_TO` relationships between transactions.
    TransactionEdges,
}

impl LoadPhase {
    /// Phases in execution order.
    pub const ALL: [Self; 4] = [
        Self::Users,
        Self::SharedEdges,
        Self::Transactions,
        Self::TransactionEdges,
    ];

    /// Stable name used in logs, metrics and error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::SharedEdges => "shared_edges",
            Self::Transactions => "transactions",
            Self::TransactionEdges => "transaction_edges",
        }
    }
}

impl fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the batches of a single phase are issued.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum LoadStrategy {
    /// One batch at a time, in slice order.
    #[default]
    Sequential,
    /// Batches of one phase are issued concurrently on the rayon pool.
    ///
    /// Requires the `parallel` feature.
    Parallel,
}

impl LoadStrategy {
    /// Whether this strategy is compiled into the current build.
    #[must_use]
    pub const fn is_available(self) -> bool {
        match self {
            Self::Sequential => true,
            Self::Parallel => cfg!(feature = "parallel"),
        }
    }
}

/// Number of batches issued per phase.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    /// Batches of user upserts.
    pub user_batches: usize,
    /// Batches of `SHARED_ATTRIBUTE` upserts.
    pub shared_edge_batches: usize,
    /// Batches of transaction upserts; each also issued one debit and one
    /// credit link operation.
    pub transaction_batches: usize,
    /// Batches of `RELATED_TO` upserts.
    pub transaction_edge_batches: usize,
}

impl LoadReport {
    /// Batches issued by `phase`.
    #[must_use]
    pub const fn batches(&self, phase: LoadPhase) -> usize {
        match phase {
            LoadPhase::Users => self.user_batches,
            LoadPhase::SharedEdges => self.shared_edge_batches,
            LoadPhase::Transactions => self.transaction_batches,
            LoadPhase::TransactionEdges => self.transaction_edge_batches,
        }
    }

    /// Total number of bulk store operations issued.
    #[must_use]
    pub const fn store_operations(&self) -> usize {
        self.user_batches
            + self.shared_edge_batches
            + self.transaction_batches * 3
            + self.transaction_edge_batches
    }
}

/// Uploads datasets in fixed-size batches.
///
/// # Examples
/// ```
/// use std::num::NonZeroUsize;
///
/// use fraudnet_core::{BatchLoader, LoadStrategy};
///
/// let loader = BatchLoader::new(NonZeroUsize::new(100).expect("non-zero"), LoadStrategy::Sequential);
/// assert_eq!(loader.batch_size().get(), 100);
/// assert_eq!(BatchLoader::default().batch_size().get(), 5_000);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BatchLoader {
    batch_size: NonZeroUsize,
    strategy: LoadStrategy,
}

impl Default for BatchLoader {
    fn default() -> Self {
        Self {
            batch_size: NonZeroUsize::new(DEFAULT_BATCH_SIZE).unwrap_or(NonZeroUsize::MIN),
            strategy: LoadStrategy::default(),
        }
    }
}

impl BatchLoader {
    /// Creates a loader issuing at most `batch_size` records per operation.
    #[must_use]
    pub const fn new(batch_size: NonZeroUsize, strategy: LoadStrategy) -> Self {
        Self {
            batch_size,
            strategy,
        }
    }

    /// Maximum records per bulk operation.
    #[must_use]
    #[rustfmt::skip]
    pub const fn batch_size(&self) -> NonZeroUsize { self.batch_size }

    /// Strategy used within each phase.
    #[must_use]
    #[rustfmt::skip]
    pub const fn strategy(&self) -> LoadStrategy { self.strategy }

    /// Loads every phase of `dataset` into `store`.
    ///
    /// # Errors
    /// Returns [`GenerationError::StrategyUnavailable`] before touching the
    /// store when the strategy is not compiled in, and
    /// [`GenerationError::Store`] naming the phase and batch of the first
    /// failing bulk operation.
    #[instrument(
        name = "loader.load",
        err,
        skip(self, store, dataset),
        fields(
            batch_size = self.batch_size.get(),
            strategy = ?self.strategy,
            users = dataset.users().len(),
            transactions = dataset.transactions().len(),
        ),
    )]
    pub fn load<S>(&self, store: &S, dataset: &SyntheticDataset) -> Result<LoadReport>
    where
        S: GraphStore + Sync + ?Sized,
    {
        if !self.strategy.is_available() {
            return Err(GenerationError::StrategyUnavailable {
                requested: self.strategy,
            });
        }
        let user_batches = self.run_phase(LoadPhase::Users, dataset.users(), |batch| {
            store.upsert_users(batch)
        })?;
        let shared_edge_batches =
            self.run_phase(LoadPhase::SharedEdges, dataset.shared_edges(), |batch| {
                store.upsert_relationships(RelationshipKind::SharedAttribute, batch)
            })?;
        let transaction_batches =
            self.run_phase(LoadPhase::Transactions, dataset.transactions(), |batch| {
                store.upsert_transactions(batch)?;
                store.link_debits(batch)?;
                store.link_credits(batch)
            })?;
        let transaction_edge_batches = self.run_phase(
            LoadPhase::TransactionEdges,
            dataset.transaction_edges(),
            |batch| store.upsert_relationships(RelationshipKind::RelatedTo, batch),
        )?;
        Ok(LoadReport {
            user_batches,
            shared_edge_batches,
            transaction_batches,
            transaction_edge_batches,
        })
    }

    #[instrument(
        name = "loader.phase",
        err,
        skip(self, records, upload),
        fields(phase = %phase, records = records.len()),
    )]
    fn run_phase<T, F>(&self, phase: LoadPhase, records: &[T], upload: F) -> Result<usize>
    where
        T: Sync,
        F: Fn(&[T]) -> StoreResult<()> + Sync,
    {
        let size = self.batch_size.get();
        let issue = |index: usize, batch: &[T]| -> Result<()> {
            upload(batch).map_err(|error| GenerationError::Store {
                phase,
                batch: index,
                error,
            })?;
            debug!(phase = %phase, batch = index, records = batch.len(), "batch loaded");
            record_batch(phase, batch.len());
            Ok(())
        };
        match self.strategy {
            LoadStrategy::Sequential => records
                .chunks(size)
                .enumerate()
                .try_for_each(|(index, batch)| issue(index, batch))?,
            #[cfg(feature = "parallel")]
            LoadStrategy::Parallel => {
                let failure = records
                    .par_chunks(size)
                    .enumerate()
                    .find_map_first(|(index, batch)| issue(index, batch).err());
                if let Some(error) = failure {
                    return Err(error);
                }
            }
            #[cfg(not(feature = "parallel"))]
            LoadStrategy::Parallel => {
                return Err(GenerationError::StrategyUnavailable {
                    requested: LoadStrategy::Parallel,
                });
            }
        }
        Ok(records.len().div_ceil(size))
    }
}

#[cfg(feature = "metrics")]
fn record_batch(phase: LoadPhase, records: usize) {
    metrics::counter!("fraudnet_batches_loaded", "phase" => phase.as_str()).increment(1);
    metrics::counter!("fraudnet_records_loaded", "phase" => phase.as_str())
        .increment(u64::try_from(records).unwrap_or(u64::MAX));
}

#[cfg(not(feature = "metrics"))]
fn record_batch(_phase: LoadPhase, _records: usize) {}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use rstest::rstest;

    use crate::{
        edges::{ReasonTag, SharedEdge},
        entity::{EntityId, EntityKind, Transaction, User},
        error::StoreError,
    };

    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    enum Op {
        Users(usize),
        Transactions(usize),
        Debits(usize),
        Credits(usize),
        Relationships(RelationshipKind, usize),
    }

    #[derive(Default)]
    struct Recorder {
        ops: Mutex<Vec<Op>>,
        fail_on: Option<usize>,
    }

    impl Recorder {
        fn failing_on(call: usize) -> Self {
            Self {
                ops: Mutex::default(),
                fail_on: Some(call),
            }
        }

        fn push(&self, op: Op) -> StoreResult<()> {
            let mut ops = self
                .ops
                .lock()
                .map_err(|_| StoreError::LockPoisoned { resource: "ops" })?;
            if self.fail_on == Some(ops.len()) {
                return Err(StoreError::Unavailable {
                    reason: "injected".into(),
                });
            }
            ops.push(op);
            Ok(())
        }

        fn ops(&self) -> Vec<Op> {
            self.ops.lock().expect("recorder lock").clone()
        }
    }

    impl GraphStore for Recorder {
        fn upsert_users(&self, users: &[User]) -> StoreResult<()> {
            self.push(Op::Users(users.len()))
        }

        fn upsert_transactions(&self, transactions: &[Transaction]) -> StoreResult<()> {
            self.push(Op::Transactions(transactions.len()))
        }

        fn link_debits(&self, transactions: &[Transaction]) -> StoreResult<()> {
            self.push(Op::Debits(transactions.len()))
        }

        fn link_credits(&self, transactions: &[Transaction]) -> StoreResult<()> {
            self.push(Op::Credits(transactions.len()))
        }

        fn upsert_relationships(
            &self,
            kind: RelationshipKind,
            edges: &[SharedEdge],
        ) -> StoreResult<()> {
            self.push(Op::Relationships(kind, edges.len()))
        }
    }

    fn user(index: usize) -> User {
        User {
            id: EntityId::for_index(EntityKind::User, index),
            name: format!("User{index}"),
            email: format!("user{index}@example.com"),
            phone: format!("+1-555-{index:07}"),
            address: format!("Address {index}"),
            payment_methods: "UPI".into(),
        }
    }

    fn transaction(index: usize) -> Transaction {
        Transaction {
            id: EntityId::for_index(EntityKind::Transaction, index),
            sender_id: EntityId::for_index(EntityKind::User, 0),
            receiver_id: EntityId::for_index(EntityKind::User, 1),
            amount: 1.5,
            ip: "10.0.0.0".into(),
            device_id: "dev_0".into(),
        }
    }

    fn edges(kind: EntityKind, count: usize) -> Vec<SharedEdge> {
        let mut accumulator = crate::edges::EdgeAccumulator::new();
        for index in 0..count {
            accumulator.add_edge(
                &EntityId::for_index(kind, index),
                &EntityId::for_index(kind, index + 1),
                ReasonTag::Seed,
            );
        }
        accumulator.finalize()
    }

    fn dataset(
        users: usize,
        shared: usize,
        transactions: usize,
        related: usize,
    ) -> SyntheticDataset {
        SyntheticDataset {
            users: (0..users).map(user).collect(),
            transactions: (0..transactions).map(transaction).collect(),
            shared_edges: edges(EntityKind::User, shared),
            transaction_edges: edges(EntityKind::Transaction, related),
            effective_user_probability: 0.0,
            effective_transaction_probability: 0.0,
        }
    }

    fn loader(batch_size: usize) -> BatchLoader {
        BatchLoader::new(
            NonZeroUsize::new(batch_size).expect("test batch sizes are non-zero"),
            LoadStrategy::Sequential,
        )
    }

    #[test]
    fn phases_run_in_order_with_debit_and_credit_per_slice() {
        let store = Recorder::default();
        let report = loader(2)
            .load(&store, &dataset(3, 1, 3, 2))
            .expect("recording store never fails");
        assert_eq!(
            store.ops(),
            vec![
                Op::Users(2),
                Op::Users(1),
                Op::Relationships(RelationshipKind::SharedAttribute, 1),
                Op::Transactions(2),
                Op::Debits(2),
                Op::Credits(2),
                Op::Transactions(1),
                Op::Debits(1),
                Op::Credits(1),
                Op::Relationships(RelationshipKind::RelatedTo, 2),
            ]
        );
        assert_eq!(
            report,
            LoadReport {
                user_batches: 2,
                shared_edge_batches: 1,
                transaction_batches: 2,
                transaction_edge_batches: 1,
            }
        );
        assert_eq!(report.store_operations(), store.ops().len());
    }

    #[test]
    fn empty_phases_issue_no_operations() {
        let store = Recorder::default();
        let report = loader(5)
            .load(&store, &dataset(4, 0, 0, 0))
            .expect("recording store never fails");
        assert_eq!(store.ops(), vec![Op::Users(4)]);
        assert_eq!(report.batches(LoadPhase::SharedEdges), 0);
    }

    #[rstest]
    #[case::first_user_batch(0, LoadPhase::Users, 0)]
    #[case::second_user_batch(1, LoadPhase::Users, 1)]
    #[case::shared_edges(2, LoadPhase::SharedEdges, 0)]
    #[case::debit_link(4, LoadPhase::Transactions, 0)]
    #[case::second_credit_link(8, LoadPhase::Transactions, 1)]
    #[case::related_edges(9, LoadPhase::TransactionEdges, 0)]
    fn first_failure_aborts_the_load(
        #[case] failing_call: usize,
        #[case] phase: LoadPhase,
        #[case] batch: usize,
    ) {
        let store = Recorder::failing_on(failing_call);
        let err = loader(2)
            .load(&store, &dataset(3, 1, 3, 2))
            .expect_err("injected failure must abort");
        assert_eq!(
            err,
            GenerationError::Store {
                phase,
                batch,
                error: StoreError::Unavailable {
                    reason: "injected".into(),
                },
            }
        );
        assert_eq!(store.ops().len(), failing_call);
    }

    #[test]
    fn phase_names_are_stable() {
        let names: Vec<&str> = LoadPhase::ALL.iter().map(|phase| phase.as_str()).collect();
        assert_eq!(
            names,
            ["users", "shared_edges", "transactions", "transaction_edges"]
        );
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_strategy_issues_the_same_batches() {
        let store = Recorder::default();
        let parallel = BatchLoader::new(
            NonZeroUsize::new(3).expect("non-zero"),
            LoadStrategy::Parallel,
        );
        let report = parallel
            .load(&store, &dataset(10, 4, 7, 5))
            .expect("recording store never fails");
        let sequential = loader(3)
            .load(&Recorder::default(), &dataset(10, 4, 7, 5))
            .expect("recording store never fails");
        assert_eq!(report, sequential);
        let ops = store.ops();
        let last_user = ops.iter().rposition(|op| matches!(op, Op::Users(_)));
        let first_shared = ops.iter().position(|op| matches!(op, Op::Relationships(..)));
        assert!(last_user < first_shared, "phases must not interleave");
        let users: usize = ops
            .iter()
            .filter_map(|op| match op {
                Op::Users(rows) => Some(*rows),
                _ => None,
            })
            .sum();
        assert_eq!(users, 10);
    }

    #[cfg(not(feature = "parallel"))]
    #[test]
    fn parallel_strategy_requires_the_feature() {
        let store = Recorder::default();
        let parallel = BatchLoader::new(NonZeroUsize::MIN, LoadStrategy::Parallel);
        let err = parallel
            .load(&store, &dataset(2, 0, 0, 0))
            .expect_err("parallel is not compiled in");
        assert_eq!(
            err,
            GenerationError::StrategyUnavailable {
                requested: LoadStrategy::Parallel,
            }
        );
        assert!(store.ops().is_empty());
    }
}
