//! Process-wide collaborators handed to every phase.

use std::future::Future;
use std::sync::Arc;

use crate::backoff::{BackoffExecutor, SinkOutcome};
use crate::browser::{BrowserAgent, NavigationRetry};
use crate::checkpoint_io::{CheckpointSlot, CheckpointStore, PROGRESS_SHEET};
use crate::error::{HarvestError, SinkError};
use crate::sink::Sink;

/// Built once at startup and cloned into each machine.
#[derive(Clone)]
pub struct HarvestContext {
  pub sink: Arc<dyn Sink>,
  pub browser: Arc<dyn BrowserAgent>,
  pub executor: BackoffExecutor,
  pub navigation: NavigationRetry,
  pub progress_sheet: String,
}

impl HarvestContext {
  pub fn new(sink: Arc<dyn Sink>, browser: Arc<dyn BrowserAgent>) -> Self {
    Self {
      sink,
      browser,
      executor: BackoffExecutor::default(),
      navigation: NavigationRetry::default(),
      progress_sheet: PROGRESS_SHEET.to_string(),
    }
  }

  pub fn with_executor(mut self, executor: BackoffExecutor) -> Self {
    self.executor = executor;
    self
  }

  pub fn with_navigation(mut self, navigation: NavigationRetry) -> Self {
    self.navigation = navigation;
    self
  }

  pub fn with_progress_sheet(mut self, sheet: impl Into<String>) -> Self {
    self.progress_sheet = sheet.into();
    self
  }

  pub fn checkpoint_store(&self, slot: CheckpointSlot) -> CheckpointStore {
    CheckpointStore::new(self.sink.clone(), self.executor, self.progress_sheet.clone(), slot)
  }

  /// Runs a sink operation under backoff. `None` means the operation was
  /// dropped after retries; fatal errors propagate.
  pub(crate) async fn attempt<T, F, Fut>(&self, label: &str, op: F) -> Result<Option<T>, HarvestError>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SinkError>>,
  {
    Ok(self.executor.execute(label, op).await?.done())
  }

  /// Like [`HarvestContext::attempt`], but a dropped operation is an error:
  /// the caller cannot make progress without the result.
  pub(crate) async fn require<T, F, Fut>(&self, label: &str, op: F) -> Result<T, HarvestError>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SinkError>>,
  {
    match self.executor.execute(label, op).await? {
      SinkOutcome::Done(v) => Ok(v),
      SinkOutcome::Dropped(e) => Err(HarvestError::Sink(e)),
    }
  }
}
