//! Support library for the fraudnet CLI binary.
//!
//! Exposes the command pipeline and logging bootstrap so doctests and tests
//! can exercise them without spawning a subprocess.

pub mod cli;
pub mod logging;
