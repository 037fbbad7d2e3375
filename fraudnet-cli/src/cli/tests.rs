//! Unit tests for argument parsing, command execution and rendering.

use super::commands::{parse_lenient, request_from};
use super::test_helpers::{parse, run_small, small_builder, temp_dir};
use super::{CliError, Command, OutputFormat, StrategyArg, render_summary, run_cli_with};

use fraudnet_core::{GenerationError, GenerationRequest};
use fraudnet_test_support::tracing::RecordingLayer;
use rstest::rstest;
use tracing::Level;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn defaults_apply_without_flags() {
    let Command::Generate(command) = parse(&["generate"]).command;
    assert_eq!(command.batch_size, 5_000);
    assert_eq!(command.strategy, StrategyArg::Sequential);
    assert_eq!(command.format, OutputFormat::Text);
    assert!(command.seed.is_none());
    assert_eq!(request_from(&command), GenerationRequest::default());
}

#[test]
fn every_flag_is_parsed() {
    let Command::Generate(command) = parse(&[
        "generate",
        "--users",
        "50",
        "--transactions",
        "120",
        "--user-density",
        "0.2",
        "--transaction-density",
        "0.4",
        "--density",
        "0.9",
        "--batch-size",
        "25",
        "--strategy",
        "parallel",
        "--seed",
        "3",
        "--format",
        "json",
        "--snapshot",
        "out.json",
    ])
    .command;
    assert_eq!(command.batch_size, 25);
    assert_eq!(command.strategy, StrategyArg::Parallel);
    assert_eq!(command.seed, Some(3));
    assert_eq!(command.format, OutputFormat::Json);
    assert_eq!(
        request_from(&command),
        GenerationRequest {
            users_count: Some(50.0),
            transactions_count: Some(120.0),
            user_density: Some(0.2),
            transaction_density: Some(0.4),
            density: Some(0.9),
        }
    );
}

#[rstest]
#[case::absent(None, None)]
#[case::integer(Some("42"), Some(42.0))]
#[case::padded(Some(" 0.5 "), Some(0.5))]
#[case::negative(Some("-3"), Some(-3.0))]
#[case::word(Some("lots"), None)]
#[case::empty(Some(""), None)]
fn lenient_parsing(#[case] raw: Option<&str>, #[case] expected: Option<f64>) {
    assert_eq!(parse_lenient("users", raw), expected);
}

#[test]
fn non_numeric_values_warn_and_fall_back() -> TestResult {
    let (result, layer) =
        RecordingLayer::capture(|| run_small(&["generate", "--users", "many", "--seed", "1"]));
    let summary = result?;
    assert_eq!(summary.summary.users_generated, 20);
    let warning = layer
        .events_at(Level::WARN)
        .into_iter()
        .find(|event| event.field("option") == Some("users"))
        .expect("non-numeric input must be reported");
    assert_eq!(warning.field("raw"), Some("many"));
    Ok(())
}

#[test]
fn generate_reports_counts_and_batches() -> TestResult {
    let summary = run_small(&[
        "generate",
        "--users",
        "30",
        "--transactions",
        "70",
        "--batch-size",
        "20",
        "--seed",
        "5",
    ])?;
    assert_eq!(summary.summary.users_generated, 30);
    assert_eq!(summary.summary.transactions_generated, 70);
    assert_eq!(summary.batches.user_batches, 2);
    assert_eq!(summary.batches.transaction_batches, 4);
    Ok(())
}

#[test]
fn seeded_runs_render_identically() -> TestResult {
    let render = || -> Result<String, Box<dyn std::error::Error>> {
        let summary = run_small(&["generate", "--density", "1", "--seed", "99"])?;
        let mut buffer = Vec::new();
        render_summary(&summary, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    };
    assert_eq!(render()?, render()?);
    Ok(())
}

#[test]
fn json_summary_uses_camel_case_keys() -> TestResult {
    let summary = run_small(&["generate", "--users", "12", "--format", "json", "--seed", "2"])?;
    let mut buffer = Vec::new();
    render_summary(&summary, &mut buffer)?;
    let value: serde_json::Value = serde_json::from_slice(&buffer)?;
    assert_eq!(value["usersGenerated"], 12);
    assert_eq!(value["transactionsGenerated"], 40);
    assert!(value["effectiveUserDensity"].is_number());
    assert_eq!(value["batches"]["userBatches"], 1);
    assert!(value.get("snapshot").is_none());
    Ok(())
}

#[test]
fn text_summary_lists_every_count() -> TestResult {
    let summary = run_small(&["generate", "--users", "10", "--density", "0", "--seed", "4"])?;
    let mut buffer = Vec::new();
    render_summary(&summary, &mut buffer)?;
    let text = String::from_utf8(buffer)?;
    for line in [
        "users generated: 10",
        "transactions generated: 40",
        "shared edges: 0",
        "transaction edges: 0",
        "user density: 0 (effective 0)",
    ] {
        assert!(text.contains(line), "missing `{line}` in:\n{text}");
    }
    Ok(())
}

#[test]
fn snapshot_is_written_as_json() -> TestResult {
    let dir = temp_dir();
    let path = dir.path().join("store.json");
    let path_arg = path.to_string_lossy().into_owned();
    let summary = run_small(&[
        "generate",
        "--users",
        "15",
        "--transactions",
        "25",
        "--seed",
        "8",
        "--snapshot",
        &path_arg,
    ])?;
    assert_eq!(summary.snapshot.as_deref(), Some(path.as_path()));
    let snapshot: serde_json::Value = serde_json::from_reader(std::fs::File::open(&path)?)?;
    assert_eq!(snapshot["users"].as_array().map(Vec::len), Some(15));
    assert_eq!(snapshot["transactions"].as_array().map(Vec::len), Some(25));
    assert_eq!(snapshot["debits"].as_array().map(Vec::len), Some(25));
    Ok(())
}

#[test]
fn unwritable_snapshot_path_is_an_io_error() {
    let dir = temp_dir();
    let path = dir.path().join("missing").join("store.json");
    let path_arg = path.to_string_lossy().into_owned();
    let err = run_small(&["generate", "--seed", "1", "--snapshot", &path_arg])
        .expect_err("parent directory does not exist");
    match err {
        CliError::Io { path: failed, .. } => assert_eq!(failed, path),
        other => panic!("expected an I/O error, got {other:?}"),
    }
}

#[test]
fn zero_batch_size_is_rejected() {
    let err = run_small(&["generate", "--batch-size", "0"]).expect_err("zero batch size");
    assert!(matches!(
        err,
        CliError::Core(GenerationError::InvalidConfiguration {
            parameter: "batch_size",
            ..
        })
    ));
}

#[cfg(not(feature = "parallel"))]
#[test]
fn parallel_strategy_requires_the_feature() {
    let err = run_small(&["generate", "--strategy", "parallel"]).expect_err("not compiled in");
    assert!(matches!(
        err,
        CliError::Core(GenerationError::StrategyUnavailable { .. })
    ));
}

#[cfg(feature = "parallel")]
#[test]
fn parallel_strategy_matches_sequential_counts() -> TestResult {
    let args = |strategy| {
        parse(&[
            "generate",
            "--users",
            "40",
            "--batch-size",
            "7",
            "--seed",
            "6",
            "--strategy",
            strategy,
        ])
    };
    let parallel = run_cli_with(args("parallel"), small_builder())?;
    let sequential = run_cli_with(args("sequential"), small_builder())?;
    assert_eq!(parallel.summary, sequential.summary);
    assert_eq!(parallel.batches, sequential.batches);
    Ok(())
}

#[test]
fn command_span_records_the_subcommand() -> TestResult {
    let (result, layer) = RecordingLayer::capture(|| run_small(&["generate", "--seed", "12"]));
    result?;
    let span = layer.span_named("cli.run").expect("cli.run span must close");
    assert_eq!(span.field("command"), Some("generate"));
    let generate = layer
        .span_named("cli.generate")
        .expect("cli.generate span must close");
    assert_eq!(generate.field("seed"), Some("12"));
    assert!(layer.has_message("command completed"));
    Ok(())
}
