//! Benchmark setup error type.
//!
//! Lets setup functions propagate failures with `?` so the Criterion entry
//! points have a single place to turn them into panics.

use fraudnet_core::{GenerationError, StoreError};

/// Errors that may occur during benchmark setup.
#[derive(Debug, thiserror::Error)]
pub enum BenchSetupError {
    /// Building the generator or its dataset failed.
    #[error("dataset generation failed: {0}")]
    Generation(#[from] GenerationError),
    /// A store write failed outside the loader.
    #[error("graph store operation failed: {0}")]
    Store(#[from] StoreError),
    /// A zero value was passed where a non-zero integer was required.
    #[error("expected a non-zero value for {context}")]
    ZeroValue {
        /// A description of the parameter that was unexpectedly zero.
        context: &'static str,
    },
}
