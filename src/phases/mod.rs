//! Phase state machines. One `step` is one unit of work: a catalog page or
//! a candidate item.

mod collection;
mod compile;

use async_trait::async_trait;

use crate::error::HarvestError;
use crate::types::Checkpoint;

pub use collection::{CollectionMachine, MAX_FAILED_PAGES};
pub use compile::CompileMachine;

#[async_trait]
pub trait PhaseMachine: Send {
  fn name(&self) -> &str;

  /// Performs the unit `cp` points at and returns the checkpoint describing
  /// the progress after it. Never saves.
  async fn step(&mut self, cp: &Checkpoint) -> Result<Checkpoint, HarvestError>;

  /// Writes buffered state (dedup additions) back to the sink.
  async fn flush(&mut self) -> Result<(), HarvestError>;
}
