//! Configuration: command-line flags overridden by `HARVEST_*` environment
//! variables. Invalid or missing settings fail before any phase starts.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, ValueEnum};
use tracing::info;

use crate::backoff::{BackoffExecutor, RetryPolicy};
use crate::browser::HttpBrowser;
use crate::checkpoint_io::PROGRESS_SHEET;
use crate::context::HarvestContext;
use crate::error::{ConfigError, HarvestError};
use crate::pipeline::PipelineKind;
use crate::runner::DriveOptions;
use crate::sink::{CsvSink, MemorySink, SheetsSink, Sink};

pub const ENV_SINK: &str = "HARVEST_SINK";
pub const ENV_DATA_DIR: &str = "HARVEST_DATA_DIR";
pub const ENV_SPREADSHEET_ID: &str = "HARVEST_SPREADSHEET_ID";
pub const ENV_SHEETS_TOKEN: &str = "HARVEST_SHEETS_TOKEN";
pub const ENV_PROGRESS_SHEET: &str = "HARVEST_PROGRESS_SHEET";
pub const ENV_RETRY_ATTEMPTS: &str = "HARVEST_RETRY_ATTEMPTS";
pub const ENV_RETRY_DELAY_SECS: &str = "HARVEST_RETRY_DELAY_SECS";
pub const ENV_MAX_UNITS: &str = "HARVEST_MAX_UNITS";
pub const ENV_UNIT_PAUSE_MS: &str = "HARVEST_UNIT_PAUSE_MS";
pub const ENV_USER_AGENT: &str = "HARVEST_USER_AGENT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SinkKind {
  #[default]
  Sheets,
  Csv,
  Memory,
}

/// Flags shared by every subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
  /// Sink backend. Overridden by HARVEST_SINK.
  #[arg(long, value_enum)]
  pub sink: Option<SinkKind>,
  /// Directory of the csv backend. Overridden by HARVEST_DATA_DIR.
  #[arg(long, value_name = "DIR")]
  pub data_dir: Option<PathBuf>,
  /// Spreadsheet of the Sheets backend. Overridden by HARVEST_SPREADSHEET_ID.
  #[arg(long, value_name = "ID")]
  pub spreadsheet_id: Option<String>,
  /// Worksheet holding checkpoint slots. Overridden by HARVEST_PROGRESS_SHEET.
  #[arg(long, value_name = "NAME")]
  pub progress_sheet: Option<String>,
  /// Stop after this many units. Overridden by HARVEST_MAX_UNITS.
  #[arg(long, value_name = "N")]
  pub max_units: Option<usize>,
  /// Pause between units in milliseconds. Overridden by HARVEST_UNIT_PAUSE_MS.
  #[arg(long, value_name = "MS")]
  pub unit_pause_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestConfig {
  pub sink: SinkKind,
  pub data_dir: Option<PathBuf>,
  pub spreadsheet_id: Option<String>,
  pub sheets_token: Option<String>,
  pub progress_sheet: String,
  pub retry: RetryPolicy,
  pub max_units: Option<usize>,
  pub unit_pause: Duration,
  pub user_agent: Option<String>,
}

fn parse<T: std::str::FromStr>(name: &'static str, raw: String) -> Result<T, ConfigError> {
  raw
    .trim()
    .parse()
    .map_err(|_| ConfigError::Invalid { name, value: raw })
}

impl HarvestConfig {
  /// Resolves settings from the process environment.
  pub fn from_env(args: &ConfigArgs) -> Result<Self, ConfigError> {
    Self::resolve(args, |name| std::env::var(name).ok())
  }

  /// Resolves settings with `lookup` standing in for the environment.
  pub fn resolve(args: &ConfigArgs, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
    let env = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let sink = match env(ENV_SINK) {
      Some(raw) => SinkKind::from_str(raw.trim(), true).map_err(|_| ConfigError::Invalid {
        name: ENV_SINK,
        value: raw,
      })?,
      None => args.sink.unwrap_or_default(),
    };
    let defaults = RetryPolicy::default();
    let retry = RetryPolicy {
      max_attempts: env(ENV_RETRY_ATTEMPTS)
        .map(|v| parse(ENV_RETRY_ATTEMPTS, v))
        .transpose()?
        .unwrap_or(defaults.max_attempts),
      initial_delay: env(ENV_RETRY_DELAY_SECS)
        .map(|v| parse(ENV_RETRY_DELAY_SECS, v).map(Duration::from_secs))
        .transpose()?
        .unwrap_or(defaults.initial_delay),
    };
    if retry.max_attempts == 0 {
      return Err(ConfigError::Invalid {
        name: ENV_RETRY_ATTEMPTS,
        value: "0".into(),
      });
    }
    let max_units = match env(ENV_MAX_UNITS) {
      Some(v) => Some(parse(ENV_MAX_UNITS, v)?),
      None => args.max_units,
    };
    let unit_pause = match env(ENV_UNIT_PAUSE_MS) {
      Some(v) => Duration::from_millis(parse(ENV_UNIT_PAUSE_MS, v)?),
      None => args
        .unit_pause_ms
        .map(Duration::from_millis)
        .unwrap_or(DriveOptions::default().unit_pause),
    };

    let config = Self {
      sink,
      data_dir: env(ENV_DATA_DIR).map(PathBuf::from).or_else(|| args.data_dir.clone()),
      spreadsheet_id: env(ENV_SPREADSHEET_ID).or_else(|| args.spreadsheet_id.clone()),
      sheets_token: env(ENV_SHEETS_TOKEN),
      progress_sheet: env(ENV_PROGRESS_SHEET)
        .or_else(|| args.progress_sheet.clone())
        .unwrap_or_else(|| PROGRESS_SHEET.to_string()),
      retry,
      max_units,
      unit_pause,
      user_agent: env(ENV_USER_AGENT),
    };
    config.validate()?;
    Ok(config)
  }

  /// Credentials and paths the selected backend needs.
  pub fn validate(&self) -> Result<(), ConfigError> {
    match self.sink {
      SinkKind::Sheets => {
        if self.spreadsheet_id.is_none() {
          return Err(ConfigError::Missing(ENV_SPREADSHEET_ID));
        }
        if self.sheets_token.is_none() {
          return Err(ConfigError::Missing(ENV_SHEETS_TOKEN));
        }
      }
      SinkKind::Csv => {
        if self.data_dir.is_none() {
          return Err(ConfigError::Missing(ENV_DATA_DIR));
        }
      }
      SinkKind::Memory => {}
    }
    Ok(())
  }

  pub fn drive_options(&self) -> DriveOptions {
    DriveOptions {
      max_units: self.max_units,
      unit_pause: self.unit_pause,
    }
  }

  pub fn build_sink(&self) -> Result<Arc<dyn Sink>, HarvestError> {
    let sink: Arc<dyn Sink> = match (self.sink, &self.spreadsheet_id, &self.sheets_token, &self.data_dir) {
      (SinkKind::Sheets, Some(id), Some(token), _) => Arc::new(SheetsSink::new(id.clone(), token.clone())?),
      (SinkKind::Sheets, None, _, _) => return Err(ConfigError::Missing(ENV_SPREADSHEET_ID).into()),
      (SinkKind::Sheets, _, None, _) => return Err(ConfigError::Missing(ENV_SHEETS_TOKEN).into()),
      (SinkKind::Csv, _, _, Some(dir)) => Arc::new(CsvSink::new(dir.clone())?),
      (SinkKind::Csv, _, _, None) => return Err(ConfigError::Missing(ENV_DATA_DIR).into()),
      (SinkKind::Memory, ..) => Arc::new(MemorySink::new()),
    };
    info!(sink = ?self.sink, "sink ready");
    Ok(sink)
  }

  /// Context for `kind`, browsing with that catalog's item selector.
  pub fn build_context(&self, kind: PipelineKind) -> Result<HarvestContext, HarvestError> {
    let browser = HttpBrowser::new(kind.extractor().item_selector(), self.user_agent.as_deref())?;
    Ok(
      HarvestContext::new(self.build_sink()?, Arc::new(browser))
        .with_executor(BackoffExecutor::new(self.retry))
        .with_progress_sheet(self.progress_sheet.clone()),
    )
  }
}
