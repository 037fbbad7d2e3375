//! Benchmark parameter types.
//!
//! Keeps the dimensions of a generation run together so benchmark IDs and
//! setup helpers agree on what each case measures.

use std::fmt;

use fraudnet_core::{GenerationPlan, LoadStrategy};

/// Parameters for a dataset generation benchmark run.
#[derive(Clone, Copy, Debug)]
pub struct GenerationBenchParams {
    /// Number of users to generate.
    pub users: usize,
    /// Number of transactions to generate.
    pub transactions: usize,
    /// Sharing density applied to both entity families.
    pub density: f64,
}

impl GenerationBenchParams {
    /// Converts the parameters into an already-clamped plan.
    #[must_use]
    pub const fn plan(&self) -> GenerationPlan {
        GenerationPlan {
            users: self.users,
            transactions: self.transactions,
            user_density: self.density,
            transaction_density: self.density,
        }
    }
}

impl fmt::Display for GenerationBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u={},t={},d={}", self.users, self.transactions, self.density)
    }
}

/// Parameters for a batch loading benchmark run.
#[derive(Clone, Copy, Debug)]
pub struct LoadBenchParams {
    /// Records written per store call.
    pub batch_size: usize,
    /// How batches are dispatched.
    pub strategy: LoadStrategy,
}

impl fmt::Display for LoadBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let strategy = match self.strategy {
            LoadStrategy::Sequential => "seq",
            LoadStrategy::Parallel => "par",
        };
        write!(f, "batch={},{strategy}", self.batch_size)
    }
}
