//! CLI: run, reset and inspect the resumable catalog pipelines.
//!
//! Usage: `harvest [OPTIONS] <COMMAND>`
//! Example: harvest --sink csv --data-dir ./sheets run vacancies
//!
//! Set RUST_LOG=catalog_harvester=trace for TRACE-level span enter/exit and events.

use std::process;

use catalog_harvester::{ConfigArgs, HarvestConfig, PipelineKind, RunOutcome, reset, run, shutdown, status};
use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

/// Resumable catalog harvester.
#[derive(Parser, Debug)]
#[command(name = "harvest")]
#[command(
  after_help = r#"Environment variables (override the matching flags when set):
  HARVEST_SINK              sheets | csv | memory (default: sheets)
  HARVEST_DATA_DIR          Directory of the csv backend
  HARVEST_SPREADSHEET_ID    Spreadsheet of the Sheets backend
  HARVEST_SHEETS_TOKEN      Bearer token of the Sheets backend
  HARVEST_PROGRESS_SHEET    Worksheet holding checkpoints (default: Progress)
  HARVEST_RETRY_ATTEMPTS    Sink attempts per operation (default: 3)
  HARVEST_RETRY_DELAY_SECS  First retry delay, doubled per retry (default: 5)
  HARVEST_MAX_UNITS         Stop after this many units; the next run resumes
  HARVEST_UNIT_PAUSE_MS     Pause between units (default: 1000)
  HARVEST_USER_AGENT        User agent for catalog requests

Examples:
  harvest run occupations
  harvest --sink csv --data-dir ./sheets run compile
  harvest reset all"#
)]
struct Cli {
  #[command(flatten)]
  config: ConfigArgs,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Run one execution of a pipeline from its checkpoint.
  Run {
    #[arg(value_enum)]
    pipeline: PipelineKind,
  },
  /// Re-initialize checkpoint slots so the next run starts over.
  Reset {
    #[arg(value_enum)]
    target: ResetTarget,
  },
  /// Print every checkpoint slot.
  Status,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ResetTarget {
  Occupations,
  Vacancies,
  Compile,
  All,
}

impl ResetTarget {
  fn kinds(self) -> Vec<PipelineKind> {
    match self {
      ResetTarget::Occupations => vec![PipelineKind::Occupations],
      ResetTarget::Vacancies => vec![PipelineKind::Vacancies],
      ResetTarget::Compile => vec![PipelineKind::Compile],
      ResetTarget::All => PipelineKind::ALL.to_vec(),
    }
  }
}

fn fail(message: &str, e: impl std::fmt::Display) -> ! {
  error!(error = %e, "{message}");
  eprintln!("{message}: {e}");
  process::exit(1);
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
    .init();

  let cli = Cli::parse();
  let config = match HarvestConfig::from_env(&cli.config) {
    Ok(c) => c,
    Err(e) => fail("Configuration error", e),
  };
  info!(sink = ?config.sink, progress_sheet = %config.progress_sheet, max_units = ?config.max_units, "options (env or flags)");

  match cli.command {
    Command::Run { pipeline } => {
      let ctx = match config.build_context(pipeline) {
        Ok(c) => c,
        Err(e) => fail("Configuration error", e),
      };
      let cancel = CancellationToken::new();
      let listener = shutdown::install(cancel.clone());
      let result = run(&ctx, pipeline, &cancel, &config.drive_options()).await;
      listener.abort();

      let report = match result {
        Ok(r) => r,
        Err(e) => fail("Run failed", e),
      };
      println!("Run {} of {}: {}", report.run_id, report.pipeline, report.outcome);
      println!("  Units: {}", report.units);
      println!(
        "  Checkpoint: phase={} cursor={} index={}",
        report.checkpoint.phase, report.checkpoint.cursor, report.checkpoint.index
      );
      if report.outcome == RunOutcome::Cancelled {
        info!("stopped by signal after saving progress");
      }
    }
    Command::Reset { target } => {
      let ctx = match config.build_context(PipelineKind::Compile) {
        Ok(c) => c,
        Err(e) => fail("Configuration error", e),
      };
      if let Err(e) = reset(&ctx, &target.kinds()).await {
        fail("Reset failed", e);
      }
      println!("Reset {:?}.", target);
    }
    Command::Status => {
      let ctx = match config.build_context(PipelineKind::Compile) {
        Ok(c) => c,
        Err(e) => fail("Configuration error", e),
      };
      let slots = match status(&ctx).await {
        Ok(s) => s,
        Err(e) => fail("Status failed", e),
      };
      for (kind, cp) in slots {
        println!(
          "{:<12} {:<8} phase={} cursor={} index={} finished={}",
          kind.to_string(),
          kind.slot().cell.to_string(),
          cp.phase,
          cp.cursor,
          cp.index,
          cp.finished
        );
      }
    }
  }
}
