//! Shared setup for generation and loading benchmarks.
//!
//! Benchmarks bypass request clamping so that small datasets can be measured
//! without tripping the production minimum transaction count.

use fraudnet_core::{GenerationLimits, Generator, GeneratorBuilder, SyntheticDataset};
use rand::{SeedableRng, rngs::SmallRng};

use crate::error::BenchSetupError;
use crate::params::{GenerationBenchParams, LoadBenchParams};

/// Seed shared by every benchmark so runs stay comparable.
pub const BENCH_SEED: u64 = 0x00f5_a1d0;

/// Limits wide enough to admit every benchmark size.
#[must_use]
pub fn bench_limits() -> GenerationLimits {
    GenerationLimits {
        min_users: 2,
        min_transactions: 0,
        ..GenerationLimits::default()
    }
}

/// Builds a seeded generator using `load` for its loader settings.
///
/// # Errors
/// Returns [`BenchSetupError::ZeroValue`] when the batch size is zero, or
/// [`BenchSetupError::Generation`] when the builder rejects the
/// configuration (for example a parallel strategy without the feature).
pub fn bench_generator(load: LoadBenchParams) -> Result<Generator, BenchSetupError> {
    if load.batch_size == 0 {
        return Err(BenchSetupError::ZeroValue {
            context: "batch size",
        });
    }
    let generator = GeneratorBuilder::new()
        .with_limits(bench_limits())
        .with_batch_size(load.batch_size)
        .with_strategy(load.strategy)
        .with_seed(BENCH_SEED)
        .build()?;
    Ok(generator)
}

/// Builds the dataset described by `params` with a fixed seed.
///
/// # Errors
/// Returns [`BenchSetupError::Generation`] when the dataset cannot be built.
pub fn bench_dataset(
    generator: &Generator,
    params: &GenerationBenchParams,
) -> Result<SyntheticDataset, BenchSetupError> {
    let mut rng = SmallRng::seed_from_u64(BENCH_SEED);
    let dataset = generator.build_dataset_with_rng(&params.plan(), &mut rng)?;
    Ok(dataset)
}
