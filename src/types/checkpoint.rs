//! Checkpoint for resumable execution.

use serde::{Deserialize, Serialize};

use super::Phase;

/// Schema version written with every checkpoint.
pub const CHECKPOINT_VERSION: u32 = 1;

/// Durable, self-describing progress record of one pipeline.
///
/// Every key is optional on the wire: an absent key takes its default so
/// older slots stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Checkpoint {
  /// Schema version.
  pub version: u32,
  pub phase: Phase,
  /// Catalog page number (1-based), meaningful while listing.
  pub cursor: u32,
  /// Offset into the candidate queue (or outer item list).
  pub index: usize,
  pub finished: bool,
  /// Consecutive listing pages skipped as unloadable.
  #[serde(skip_serializing_if = "is_zero")]
  pub failed_pages: u32,
}

fn is_zero(n: &u32) -> bool {
  *n == 0
}

impl Default for Checkpoint {
  fn default() -> Self {
    Self {
      version: CHECKPOINT_VERSION,
      phase: Phase::List,
      cursor: 1,
      index: 0,
      finished: false,
      failed_pages: 0,
    }
  }
}

impl Checkpoint {
  /// Parses a slot value, normalizing `finished` and `phase` so either one
  /// alone marks the terminal state.
  pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
    let cp: Checkpoint = serde_json::from_str(raw)?;
    Ok(cp.normalized())
  }

  pub fn to_json(&self) -> Result<String, serde_json::Error> {
    serde_json::to_string(self)
  }

  fn normalized(mut self) -> Self {
    if self.finished || self.phase == Phase::Finished {
      self.finished = true;
      self.phase = Phase::Finished;
    }
    if self.cursor == 0 {
      self.cursor = 1;
    }
    self
  }

  pub fn is_finished(&self) -> bool {
    self.finished
  }

  /// Same phase, next catalog page.
  pub fn next_page(&self) -> Self {
    Self {
      cursor: self.cursor + 1,
      index: 0,
      failed_pages: 0,
      ..self.clone()
    }
  }

  /// Next catalog page after an unloadable one.
  pub fn skip_page(&self) -> Self {
    Self {
      cursor: self.cursor + 1,
      index: 0,
      failed_pages: self.failed_pages + 1,
      ..self.clone()
    }
  }

  /// Same phase, next item.
  pub fn next_item(&self) -> Self {
    Self {
      index: self.index + 1,
      ..self.clone()
    }
  }

  /// LIST -> DETAIL: the cursor keeps its last value, index restarts.
  pub fn enter_detail(&self) -> Self {
    Self {
      phase: Phase::Detail,
      index: 0,
      failed_pages: 0,
      ..self.clone()
    }
  }

  /// Next outer item with pagination restarted at page 1.
  pub fn next_outer(&self) -> Self {
    Self {
      cursor: 1,
      index: self.index + 1,
      ..self.clone()
    }
  }

  pub fn finish(&self) -> Self {
    Self {
      phase: Phase::Finished,
      finished: true,
      ..self.clone()
    }
  }
}
