//! Backoff executor: retries transient Sink failures with exponential delay.

use std::future::Future;
use std::time::Duration;

use tracing::{instrument, warn};

use crate::error::SinkError;

/// Attempt ceiling and first delay of the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  pub max_attempts: u32,
  pub initial_delay: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      initial_delay: Duration::from_secs(5),
    }
  }
}

impl RetryPolicy {
  /// Delay slept after failed attempt number `attempt` (1-based).
  pub fn delay_after(&self, attempt: u32) -> Duration {
    self
      .initial_delay
      .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
  }

  /// Upper bound on total sleep across all attempts: `delay0 * (2^N - 1)`.
  pub fn max_total_delay(&self) -> Duration {
    self
      .initial_delay
      .saturating_mul(2u32.saturating_pow(self.max_attempts).saturating_sub(1))
  }
}

/// Result of a guarded operation that did not fail fatally.
#[derive(Debug)]
pub enum SinkOutcome<T> {
  Done(T),
  /// Retries were exhausted; the operation's effect is dropped.
  Dropped(SinkError),
}

impl<T> SinkOutcome<T> {
  pub fn done(self) -> Option<T> {
    match self {
      SinkOutcome::Done(v) => Some(v),
      SinkOutcome::Dropped(_) => None,
    }
  }

  pub fn is_dropped(&self) -> bool {
    matches!(self, SinkOutcome::Dropped(_))
  }
}

/// Wraps Sink calls: retryable failures sleep and retry, fatal ones
/// propagate immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackoffExecutor {
  policy: RetryPolicy,
}

impl BackoffExecutor {
  pub fn new(policy: RetryPolicy) -> Self {
    Self { policy }
  }

  pub fn policy(&self) -> RetryPolicy {
    self.policy
  }

  /// Runs `operation` up to `max_attempts` times.
  ///
  /// Returns `Err` only for a non-retryable failure; exhaustion is reported
  /// as [`SinkOutcome::Dropped`].
  #[instrument(level = "trace", skip(self, operation))]
  pub async fn execute<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<SinkOutcome<T>, SinkError>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SinkError>>,
  {
    let attempts = self.policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
      match operation().await {
        Ok(v) => return Ok(SinkOutcome::Done(v)),
        Err(e) if !e.is_retryable() => return Err(e),
        Err(e) if attempt >= attempts => {
          warn!(op = label, attempts, error = %e, "sink operation dropped after retries");
          return Ok(SinkOutcome::Dropped(e));
        }
        Err(e) => {
          let delay = self.policy.delay_after(attempt);
          warn!(
            op = label,
            attempt,
            attempts,
            delay_secs = delay.as_secs_f64(),
            error = %e,
            "transient sink error, retrying"
          );
          tokio::time::sleep(delay).await;
          attempt += 1;
        }
      }
    }
  }
}
