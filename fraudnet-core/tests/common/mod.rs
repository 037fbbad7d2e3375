//! Shared helpers for `fraudnet-core` integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use fraudnet_core::{
    GenerationLimits, Generator, GeneratorBuilder, GraphStore, MemoryGraphStore,
    RelationshipKind, SharedEdge, StoreError, StoreResult, Transaction, User,
};

/// Limits small enough for fast tests: 2..=200 users, 0..=500 transactions.
#[must_use]
pub fn small_limits() -> GenerationLimits {
    GenerationLimits {
        default_users: 50,
        min_users: 2,
        max_users: 200,
        default_transactions: 100,
        min_transactions: 0,
        max_transactions: 500,
        ..GenerationLimits::default()
    }
}

/// Seeded generator over [`small_limits`] with the given batch size.
#[must_use]
pub fn small_generator(batch_size: usize) -> Generator {
    GeneratorBuilder::new()
        .with_limits(small_limits())
        .with_batch_size(batch_size)
        .with_seed(2024)
        .build()
        .expect("test configuration is valid")
}

/// Memory store that rejects the bulk operation with a given zero-based
/// index and forwards every other call.
#[derive(Debug, Default)]
pub struct FailingStore {
    inner: MemoryGraphStore,
    calls: AtomicUsize,
    fail_at: usize,
}

impl FailingStore {
    #[must_use]
    pub fn failing_at(fail_at: usize) -> Self {
        Self {
            fail_at,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn inner(&self) -> &MemoryGraphStore {
        &self.inner
    }

    fn gate(&self, operation: &'static str) -> StoreResult<()> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == self.fail_at {
            return Err(StoreError::Rejected {
                operation,
                reason: "constraint violated".into(),
            });
        }
        Ok(())
    }
}

impl GraphStore for FailingStore {
    fn upsert_users(&self, users: &[User]) -> StoreResult<()> {
        self.gate("upsert_users")?;
        self.inner.upsert_users(users)
    }

    fn upsert_transactions(&self, transactions: &[Transaction]) -> StoreResult<()> {
        self.gate("upsert_transactions")?;
        self.inner.upsert_transactions(transactions)
    }

    fn link_debits(&self, transactions: &[Transaction]) -> StoreResult<()> {
        self.gate("link_debits")?;
        self.inner.link_debits(transactions)
    }

    fn link_credits(&self, transactions: &[Transaction]) -> StoreResult<()> {
        self.gate("link_credits")?;
        self.inner.link_credits(transactions)
    }

    fn upsert_relationships(
        &self,
        kind: RelationshipKind,
        edges: &[SharedEdge],
    ) -> StoreResult<()> {
        self.gate("upsert_relationships")?;
        self.inner.upsert_relationships(kind, edges)
    }
}
