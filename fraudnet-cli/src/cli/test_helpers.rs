//! Small helpers shared across CLI tests.

use clap::Parser;
use fraudnet_core::{GenerationLimits, GeneratorBuilder};
use tempfile::TempDir;

use super::{Cli, CliError, ExecutionSummary, run_cli_with};

pub(super) fn temp_dir() -> TempDir {
    match TempDir::new() {
        Ok(dir) => dir,
        Err(err) => panic!("failed to create temp dir: {err}"),
    }
}

/// Parses `args` after the binary name.
pub(super) fn parse(args: &[&str]) -> Cli {
    let argv = std::iter::once("fraudnet").chain(args.iter().copied());
    match Cli::try_parse_from(argv) {
        Ok(cli) => cli,
        Err(err) => panic!("arguments must parse: {err}"),
    }
}

/// Builder with limits small enough for unit tests.
pub(super) fn small_builder() -> GeneratorBuilder {
    GeneratorBuilder::new().with_limits(GenerationLimits {
        default_users: 20,
        min_users: 2,
        max_users: 100,
        default_transactions: 40,
        min_transactions: 0,
        max_transactions: 200,
        ..GenerationLimits::default()
    })
}

pub(super) fn run_small(args: &[&str]) -> Result<ExecutionSummary, CliError> {
    run_cli_with(parse(args), small_builder())
}
