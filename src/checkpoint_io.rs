//! Checkpoint save/load against a slot cell of the progress worksheet.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::backoff::{BackoffExecutor, SinkOutcome};
use crate::error::HarvestError;
use crate::sink::Sink;
use crate::types::{CellRef, Checkpoint};

/// Default name of the worksheet holding checkpoint slots.
pub const PROGRESS_SHEET: &str = "Progress";

/// Named cell holding one sub-pipeline's checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointSlot {
  pub name: &'static str,
  pub cell: CellRef,
}

impl CheckpointSlot {
  pub const fn new(name: &'static str, row: usize, column: usize) -> Self {
    Self {
      name,
      cell: CellRef { row, column },
    }
  }
}

/// Reads and writes one slot. Last writer wins; one writer per slot is
/// assumed, not enforced.
#[derive(Clone)]
pub struct CheckpointStore {
  sink: Arc<dyn Sink>,
  executor: BackoffExecutor,
  sheet: String,
  slot: CheckpointSlot,
}

impl CheckpointStore {
  pub fn new(
    sink: Arc<dyn Sink>,
    executor: BackoffExecutor,
    sheet: impl Into<String>,
    slot: CheckpointSlot,
  ) -> Self {
    Self {
      sink,
      executor,
      sheet: sheet.into(),
      slot,
    }
  }

  pub fn slot(&self) -> CheckpointSlot {
    self.slot
  }

  /// Loads the slot. Empty or unparsable slots yield the default checkpoint;
  /// a slot that cannot be read at all after retries is an error, since
  /// starting fresh would redo (and clear) finished work.
  #[instrument(level = "trace", skip(self), fields(slot = self.slot.name))]
  pub async fn load(&self) -> Result<Checkpoint, HarvestError> {
    let sheet = self.sheet.as_str();
    let cell = self.slot.cell;
    let read = self
      .executor
      .execute("read checkpoint", || self.sink.read_cell(sheet, cell))
      .await?;
    let raw = match read {
      SinkOutcome::Done(v) => v,
      SinkOutcome::Dropped(e) => {
        warn!(slot = self.slot.name, error = %e, "checkpoint slot unreadable");
        return Err(HarvestError::CheckpointUnavailable(self.slot.name.to_string()));
      }
    };
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
      info!(slot = self.slot.name, "no checkpoint found, starting fresh");
      return Ok(Checkpoint::default());
    };
    match Checkpoint::from_json(&raw) {
      Ok(cp) => {
        info!(
          slot = self.slot.name,
          phase = %cp.phase,
          cursor = cp.cursor,
          index = cp.index,
          "resuming from checkpoint"
        );
        Ok(cp)
      }
      Err(e) => {
        warn!(slot = self.slot.name, error = %e, raw = %raw, "unparsable checkpoint, starting fresh");
        Ok(Checkpoint::default())
      }
    }
  }

  /// Overwrites the slot. Returns `false` when the write was dropped after
  /// retries.
  #[instrument(level = "trace", skip(self, cp), fields(slot = self.slot.name))]
  pub async fn save(&self, cp: &Checkpoint) -> Result<bool, HarvestError> {
    let json = cp.to_json()?;
    let sheet = self.sheet.as_str();
    let cell = self.slot.cell;
    let written = self
      .executor
      .execute("save checkpoint", || self.sink.write_cell(sheet, cell, &json))
      .await?;
    if written.is_dropped() {
      warn!(slot = self.slot.name, checkpoint = %json, "checkpoint save dropped");
      return Ok(false);
    }
    Ok(true)
  }

  /// Operator restart: re-initializes the slot to the default checkpoint.
  pub async fn reset(&self) -> Result<bool, HarvestError> {
    info!(slot = self.slot.name, "resetting checkpoint");
    self.save(&Checkpoint::default()).await
  }
}
