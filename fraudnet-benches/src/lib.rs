//! Benchmark support crate for fraudnet.
//!
//! Provides parameter types and setup helpers used by the Criterion
//! benchmarks for the two expensive stages of a run: building a synthetic
//! dataset and loading it into a graph store in batches.

pub mod error;
pub mod params;
pub mod setup;
