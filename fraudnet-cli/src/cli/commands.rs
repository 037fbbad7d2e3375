//! Command implementations and argument parsing for the fraudnet CLI.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use fraudnet_core::{
    DEFAULT_BATCH_SIZE, GenerationError, GenerationRequest, GenerationSummary, GeneratorBuilder,
    LoadReport, LoadStrategy, MemoryGraphStore,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{Span, field, info, instrument, warn};

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(
    name = "fraudnet",
    about = "Generate synthetic fraud networks and load them into a graph store."
)]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Generate a dataset and load it into the in-memory store.
    Generate(GenerateCommand),
}

/// Options accepted by the `generate` command.
///
/// Counts and densities are taken as raw text and parsed leniently: values
/// that are not numbers are treated as absent so the generator defaults
/// apply.
#[derive(Debug, Args, Clone)]
pub struct GenerateCommand {
    /// Number of users (clamped into the generator limits).
    #[arg(long)]
    pub users: Option<String>,

    /// Number of transactions (clamped into the generator limits).
    #[arg(long)]
    pub transactions: Option<String>,

    /// Sharing density for user attributes.
    #[arg(long = "user-density")]
    pub user_density: Option<String>,

    /// Sharing density for transaction attributes.
    #[arg(long = "transaction-density")]
    pub transaction_density: Option<String>,

    /// Fallback density for both families.
    #[arg(long)]
    pub density: Option<String>,

    /// Records per bulk store operation.
    #[arg(
        long = "batch-size",
        env = "FRAUDNET_BATCH_SIZE",
        default_value_t = DEFAULT_BATCH_SIZE,
        value_parser = clap::value_parser!(usize),
    )]
    pub batch_size: usize,

    /// How batches within one phase are issued.
    #[arg(long, value_enum, default_value_t = StrategyArg::Sequential)]
    pub strategy: StrategyArg,

    /// Seed for reproducible output.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Summary format written to stdout.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Write a JSON snapshot of the loaded store to this path.
    #[arg(long)]
    pub snapshot: Option<PathBuf>,
}

/// Load strategies selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    /// Issue batches one at a time.
    Sequential,
    /// Issue the batches of each phase concurrently.
    Parallel,
}

impl From<StrategyArg> for LoadStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Sequential => Self::Sequential,
            StrategyArg::Parallel => Self::Parallel,
        }
    }
}

/// Output formats for the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One `key: value` line per field.
    Text,
    /// A single JSON object.
    Json,
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Generation or loading failed.
    #[error(transparent)]
    Core(#[from] GenerationError),
    /// The snapshot file could not be created or flushed.
    #[error("failed to write snapshot `{path}`: {source}")]
    Io {
        /// Path that triggered the failure.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// The snapshot could not be serialised.
    #[error("failed to serialise snapshot `{path}`: {source}")]
    Snapshot {
        /// Destination path.
        path: PathBuf,
        /// Underlying serialisation error.
        #[source]
        source: serde_json::Error,
    },
}

/// Outcome of a successful `generate` command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSummary {
    /// Counts and densities of the run.
    #[serde(flatten)]
    pub summary: GenerationSummary,
    /// Batches issued per phase.
    pub batches: LoadReport,
    /// Snapshot destination, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<PathBuf>,
    /// Format [`render_summary`] writes.
    #[serde(skip)]
    pub format: OutputFormat,
}

/// Executes the CLI command represented by `cli` with default generator
/// settings.
///
/// # Errors
/// Returns [`CliError`] when generation, loading or the snapshot fails.
pub fn run_cli(cli: Cli) -> Result<ExecutionSummary, CliError> {
    run_cli_with(cli, GeneratorBuilder::new())
}

/// Executes `cli`, layering its options over `base`.
///
/// # Errors
/// Returns [`CliError`] when generation, loading or the snapshot fails.
///
/// # Examples
/// ```
/// use clap::Parser;
/// use fraudnet_cli::cli::{Cli, run_cli_with};
/// use fraudnet_core::{GenerationLimits, GeneratorBuilder};
///
/// let limits = GenerationLimits {
///     min_transactions: 0,
///     max_transactions: 20,
///     ..GenerationLimits::default()
/// };
/// let cli = Cli::try_parse_from(["fraudnet", "generate", "--users", "12", "--transactions", "20"])
///     .expect("arguments parse");
/// let summary = run_cli_with(cli, GeneratorBuilder::new().with_limits(limits))
///     .expect("generation succeeds");
/// assert_eq!(summary.summary.users_generated, 12);
/// assert_eq!(summary.summary.transactions_generated, 20);
/// ```
#[instrument(
    name = "cli.run",
    err,
    skip(cli, base),
    fields(command = field::Empty),
)]
pub fn run_cli_with(cli: Cli, base: GeneratorBuilder) -> Result<ExecutionSummary, CliError> {
    match cli.command {
        Command::Generate(generate) => {
            Span::current().record("command", field::display("generate"));
            run_generate(generate, base)
        }
    }
}

#[instrument(
    name = "cli.generate",
    err,
    skip(command, base),
    fields(batch_size = command.batch_size, strategy = field::Empty, seed = field::Empty),
)]
pub(super) fn run_generate(
    command: GenerateCommand,
    base: GeneratorBuilder,
) -> Result<ExecutionSummary, CliError> {
    let span = Span::current();
    span.record("strategy", field::debug(command.strategy));
    let mut builder = base
        .with_batch_size(command.batch_size)
        .with_strategy(command.strategy.into());
    if let Some(seed) = command.seed {
        span.record("seed", seed);
        builder = builder.with_seed(seed);
    }
    let generator = builder.build()?;
    let request = request_from(&command);
    let store = MemoryGraphStore::new();
    let (summary, batches) = generator.run_with_report(&request, &store)?;

    if let Some(path) = &command.snapshot {
        write_snapshot(&store, path)?;
    }
    info!(
        users = summary.users_generated,
        transactions = summary.transactions_generated,
        skipped = store.skipped_count(),
        "command completed"
    );
    Ok(ExecutionSummary {
        summary,
        batches,
        snapshot: command.snapshot,
        format: command.format,
    })
}

pub(super) fn request_from(command: &GenerateCommand) -> GenerationRequest {
    GenerationRequest {
        users_count: parse_lenient("users", command.users.as_deref()),
        transactions_count: parse_lenient("transactions", command.transactions.as_deref()),
        user_density: parse_lenient("user-density", command.user_density.as_deref()),
        transaction_density: parse_lenient(
            "transaction-density",
            command.transaction_density.as_deref(),
        ),
        density: parse_lenient("density", command.density.as_deref()),
    }
}

/// Parses `raw` as a number, treating anything unparsable as absent.
pub(super) fn parse_lenient(option: &'static str, raw: Option<&str>) -> Option<f64> {
    let raw = raw?;
    match raw.trim().parse::<f64>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(option, raw, "ignoring non-numeric value");
            None
        }
    }
}

#[instrument(name = "cli.write_snapshot", err, skip(store), fields(path = %path.display()))]
pub(super) fn write_snapshot(store: &MemoryGraphStore, path: &Path) -> Result<(), CliError> {
    let io_error = |source| CliError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_error)?;
    let mut writer = BufWriter::new(file);
    store
        .write_snapshot(&mut writer)
        .map_err(|source| CliError::Snapshot {
            path: path.to_path_buf(),
            source,
        })?;
    writer.flush().map_err(io_error)
}

/// Renders `summary` to `writer` in the format it was requested in.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use fraudnet_cli::cli::{ExecutionSummary, OutputFormat, render_summary};
/// # use fraudnet_core::{GenerationSummary, LoadReport};
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let summary = ExecutionSummary {
///     summary: GenerationSummary {
///         users_generated: 10,
///         transactions_generated: 100_000,
///         shared_edge_count: 0,
///         transaction_edge_count: 0,
///         user_density: 0.0,
///         transaction_density: 0.0,
///         effective_user_density: 0.0,
///         effective_transaction_density: 0.0,
///     },
///     batches: LoadReport::default(),
///     snapshot: None,
///     format: OutputFormat::Text,
/// };
/// let mut buffer = Vec::new();
/// render_summary(&summary, &mut buffer)?;
/// let text = String::from_utf8(buffer)?;
/// assert!(text.starts_with("users generated: 10\n"));
/// # Ok(())
/// # }
/// ```
pub fn render_summary(summary: &ExecutionSummary, mut writer: impl Write) -> io::Result<()> {
    match summary.format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, summary)?;
            writeln!(writer)
        }
        OutputFormat::Text => render_text(summary, writer),
    }
}

fn render_text(summary: &ExecutionSummary, mut writer: impl Write) -> io::Result<()> {
    let counts = &summary.summary;
    writeln!(writer, "users generated: {}", counts.users_generated)?;
    writeln!(writer, "transactions generated: {}", counts.transactions_generated)?;
    writeln!(writer, "shared edges: {}", counts.shared_edge_count)?;
    writeln!(writer, "transaction edges: {}", counts.transaction_edge_count)?;
    writeln!(
        writer,
        "user density: {} (effective {})",
        counts.user_density, counts.effective_user_density
    )?;
    writeln!(
        writer,
        "transaction density: {} (effective {})",
        counts.transaction_density, counts.effective_transaction_density
    )?;
    writeln!(writer, "store operations: {}", summary.batches.store_operations())?;
    if let Some(path) = &summary.snapshot {
        writeln!(writer, "snapshot: {}", path.display())?;
    }
    Ok(())
}
