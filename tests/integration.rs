//! End-to-end runs of whole pipelines against in-process and csv sinks,
//! including executions killed between units, plus `harvest` CLI checks.

use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use catalog_harvester::browser::NavigationRetry;
use catalog_harvester::sink::{CsvSink, MemorySink, Sink, SinkOp};
use catalog_harvester::testing::{ScriptedBrowser, stub_pipeline};
use catalog_harvester::types::{DETAIL_UNAVAILABLE, SinkRow, decode_hyperlink};
use catalog_harvester::{
  BackoffExecutor, DriveOptions, HarvestContext, HarvestError, PipelineKind, RetryPolicy, RunOutcome, SinkError, reset,
  run_collection,
};
use tokio_util::sync::CancellationToken;

fn catalog() -> Arc<ScriptedBrowser> {
  let pipeline = stub_pipeline();
  Arc::new(
    ScriptedBrowser::new()
      .with_listing(
        &pipeline.listing_url(1),
        &["a|https://d/a|Alpha|t1", "b|https://d/b|Beta|"],
        true,
      )
      .with_listing(&pipeline.listing_url(2), &["A|https://d/a2|Alpha again|t2", "c||Gamma|"], false)
      .with_detail("https://d/a", "Title A|Body A")
      .with_detail("https://d/b", "Title B|")
      .with_detail("https://d/a2", "Title A2|Body A2"),
  )
}

fn context(sink: Arc<dyn Sink>, browser: &Arc<ScriptedBrowser>) -> HarvestContext {
  HarvestContext::new(sink, browser.clone())
    .with_executor(BackoffExecutor::new(RetryPolicy {
      max_attempts: 3,
      initial_delay: Duration::from_secs(1),
    }))
    .with_navigation(NavigationRetry {
      attempts: 3,
      pause: Duration::from_secs(1),
    })
}

fn options(max_units: Option<usize>) -> DriveOptions {
  DriveOptions {
    max_units,
    unit_pause: Duration::ZERO,
  }
}

fn assert_expected_records(rows: &[SinkRow]) {
  assert_eq!(rows.len(), 4, "header plus one row per distinct key: {rows:?}");
  assert_eq!(rows[0], vec!["id", "name", "link", "title", "body", "tags"]);
  assert_eq!(rows[1][0], "a");
  assert_eq!(decode_hyperlink(&rows[1][2]), "https://d/a");
  assert_eq!(rows[1][3], "Title A");
  assert_eq!(rows[1][5], "t1,t2");
  assert_eq!(rows[2][0], "b");
  assert_eq!(rows[2][4], "No body given");
  assert_eq!(rows[3][0], "c");
  assert_eq!(rows[3][3], DETAIL_UNAVAILABLE);
  assert_eq!(rows[3][4], DETAIL_UNAVAILABLE);
}

#[tokio::test(start_paused = true)]
async fn uninterrupted_run_collects_every_key_once() {
  let sink = Arc::new(MemorySink::new());
  let browser = catalog();
  let report = run_collection(
    &context(sink.clone(), &browser),
    stub_pipeline(),
    &CancellationToken::new(),
    &options(None),
  )
  .await
  .unwrap();

  assert_eq!(report.outcome, RunOutcome::Finished);
  // two pages, four candidates, one terminal step
  assert_eq!(report.units, 7);
  assert_expected_records(&sink.rows("Records"));
  assert_eq!(sink.rows("Queue").len(), 5);
  assert_eq!(sink.rows("Ledger").len(), 3);
  assert_eq!(browser.visit_count("https://d/a2"), 0);
}

#[tokio::test(start_paused = true)]
async fn one_unit_executions_match_an_uninterrupted_run() {
  let sink = Arc::new(MemorySink::new());
  let browser = catalog();
  let mut executions = 0;
  loop {
    executions += 1;
    assert!(executions <= 20, "run never finished");
    let report = run_collection(
      &context(sink.clone(), &browser),
      stub_pipeline(),
      &CancellationToken::new(),
      &options(Some(1)),
    )
    .await
    .unwrap();
    match report.outcome {
      RunOutcome::Suspended => continue,
      RunOutcome::Finished => break,
      other => panic!("unexpected outcome {other}"),
    }
  }

  assert_eq!(executions, 7);
  assert_expected_records(&sink.rows("Records"));
  let again = run_collection(
    &context(sink.clone(), &browser),
    stub_pipeline(),
    &CancellationToken::new(),
    &options(None),
  )
  .await
  .unwrap();
  assert_eq!(again.outcome, RunOutcome::AlreadyFinished);
}

#[tokio::test(start_paused = true)]
async fn crash_between_append_and_checkpoint_does_not_duplicate() {
  let sink = Arc::new(MemorySink::new());
  let browser = catalog();
  let ctx = context(sink.clone(), &browser);

  // LIST pages
  let listed = run_collection(&ctx, stub_pipeline(), &CancellationToken::new(), &options(Some(2)))
    .await
    .unwrap();
  assert_eq!(listed.outcome, RunOutcome::Suspended);

  // first record is appended, then the checkpoint write fails fatally
  sink.fail_next(SinkOp::WriteCell, vec![SinkError::status(403, "quota")]);
  let crashed = run_collection(&ctx, stub_pipeline(), &CancellationToken::new(), &options(None)).await;
  assert!(matches!(crashed, Err(HarvestError::Sink(_))));
  assert_eq!(sink.rows("Records").len(), 2);

  let resumed = run_collection(&ctx, stub_pipeline(), &CancellationToken::new(), &options(None))
    .await
    .unwrap();
  assert_eq!(resumed.outcome, RunOutcome::Finished);
  assert_expected_records(&sink.rows("Records"));
  assert_eq!(browser.visit_count("https://d/a"), 1);
}

#[tokio::test(start_paused = true)]
async fn csv_sink_survives_restart_without_duplicates() {
  let dir = tempfile::tempdir().unwrap();
  let browser = catalog();
  let first: Arc<dyn Sink> = Arc::new(CsvSink::new(dir.path()).unwrap());
  let report = run_collection(
    &context(first, &browser),
    stub_pipeline(),
    &CancellationToken::new(),
    &options(None),
  )
  .await
  .unwrap();
  assert_eq!(report.outcome, RunOutcome::Finished);

  // a new process over the same files, after an operator reset
  let second: Arc<dyn Sink> = Arc::new(CsvSink::new(dir.path()).unwrap());
  let ctx = context(second.clone(), &browser);
  reset(&ctx, &[PipelineKind::Vacancies]).await.unwrap();
  let rerun = run_collection(&ctx, stub_pipeline(), &CancellationToken::new(), &options(None))
    .await
    .unwrap();
  assert_eq!(rerun.outcome, RunOutcome::Finished);

  let rows = second.read_rows("Records").await.unwrap();
  assert_expected_records(&rows);
  assert!(dir.path().join("Records.csv").is_file());
  assert!(dir.path().join("Progress.csv").is_file());
}

// ---- CLI ----

fn harvest(args: &[&str], env: &[(&str, &str)]) -> (String, String, bool) {
  let cargo = std::env::var("CARGO").unwrap_or_else(|_| "cargo".to_string());
  let mut cmd = Command::new(cargo.as_str());
  cmd
    .args(["run", "--quiet", "--bin", "harvest", "--"])
    .args(args)
    .current_dir(env!("CARGO_MANIFEST_DIR"))
    .env_remove("HARVEST_SINK")
    .env_remove("HARVEST_SPREADSHEET_ID")
    .env_remove("HARVEST_SHEETS_TOKEN")
    .env_remove("HARVEST_DATA_DIR");
  for (k, v) in env {
    cmd.env(k, v);
  }
  let out = cmd.output().expect("cargo run --bin harvest");
  (
    String::from_utf8_lossy(&out.stdout).into_owned(),
    String::from_utf8_lossy(&out.stderr).into_owned(),
    out.status.success(),
  )
}

#[test]
fn cli_missing_credentials_fail_before_running() {
  let (_, stderr, ok) = harvest(&["run", "occupations"], &[]);
  assert!(!ok);
  assert!(stderr.contains("HARVEST_SPREADSHEET_ID"), "stderr: {stderr}");
}

#[test]
fn cli_status_lists_every_slot() {
  let dir = tempfile::tempdir().unwrap();
  let data_dir = dir.path().to_str().unwrap();
  let (stdout, stderr, ok) = harvest(&["status"], &[("HARVEST_SINK", "csv"), ("HARVEST_DATA_DIR", data_dir)]);
  assert!(ok, "stderr: {stderr}");
  for name in ["occupations", "vacancies", "compile"] {
    assert!(stdout.contains(name), "stdout: {stdout}");
  }
  assert!(stdout.contains("phase=list"));
}
