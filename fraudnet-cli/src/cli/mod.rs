//! Command-line interface for generating and loading synthetic fraud
//! networks.
//!
//! The `generate` command builds a dataset, loads it into the in-memory graph
//! store, optionally exports a JSON snapshot, and reports a summary.

mod commands;

pub use commands::{
    Cli, CliError, Command, ExecutionSummary, GenerateCommand, OutputFormat, StrategyArg,
    render_summary, run_cli, run_cli_with,
};

#[cfg(test)]
mod test_helpers;
#[cfg(test)]
mod tests;
