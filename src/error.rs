//! Error taxonomy of the harvester.

use thiserror::Error;

/// Status codes the backoff executor treats as transient.
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Failure of one Sink operation.
#[derive(Debug, Error)]
pub enum SinkError {
  /// Non-success response from the sink service (429 = quota exceeded).
  #[error("sink responded {status}: {message}")]
  Status { status: u16, message: String },
  #[error("sink read timed out: {0}")]
  Timeout(String),
  #[error("worksheet not found: {0}")]
  WorksheetNotFound(String),
  #[error("sink transport error: {0}")]
  Transport(String),
  #[error("malformed sink response: {0}")]
  Malformed(String),
  #[error("sink io error: {0}")]
  Io(#[from] std::io::Error),
  #[error("sink csv error: {0}")]
  Csv(#[from] csv::Error),
}

impl SinkError {
  pub fn status(status: u16, message: impl Into<String>) -> Self {
    SinkError::Status {
      status,
      message: message.into(),
    }
  }

  /// Rate limits, 5xx gateway errors and read timeouts are worth retrying;
  /// everything else is fatal.
  pub fn is_retryable(&self) -> bool {
    match self {
      SinkError::Status { status, .. } => RETRYABLE_STATUSES.contains(status),
      SinkError::Timeout(_) => true,
      _ => false,
    }
  }
}

impl From<reqwest::Error> for SinkError {
  fn from(e: reqwest::Error) -> Self {
    if e.is_timeout() {
      SinkError::Timeout(e.to_string())
    } else if let Some(status) = e.status() {
      SinkError::status(status.as_u16(), e.to_string())
    } else if e.is_decode() {
      SinkError::Malformed(e.to_string())
    } else {
      SinkError::Transport(e.to_string())
    }
  }
}

/// A page could not be loaded.
#[derive(Debug, Error)]
pub enum NavigationError {
  #[error("{url} responded {status}")]
  Status { url: String, status: u16 },
  #[error("timed out loading {0}")]
  Timeout(String),
  #[error("failed to load {url}: {message}")]
  Transport { url: String, message: String },
}

/// Invalid or missing configuration. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("missing required setting {0}")]
  Missing(&'static str),
  #[error("invalid value for {name}: {value}")]
  Invalid { name: &'static str, value: String },
}

/// Errors that stop a run.
#[derive(Debug, Error)]
pub enum HarvestError {
  #[error(transparent)]
  Config(#[from] ConfigError),
  /// Non-retryable sink failure.
  #[error(transparent)]
  Sink(#[from] SinkError),
  /// The checkpoint slot could not be read even after retries.
  #[error("checkpoint slot {0} could not be read")]
  CheckpointUnavailable(String),
  #[error("worksheet {sheet} has no column named {column:?}")]
  MissingColumn { sheet: String, column: String },
  #[error("checkpoint could not be serialized: {0}")]
  InvalidCheckpoint(#[from] serde_json::Error),
}
