//! Shared test utilities used across fraudnet crates.

pub mod ci;
pub mod tracing;
