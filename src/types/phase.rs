//! Phase of a collection pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Named stage of a pipeline. Transitions only run forward:
/// `List -> Detail -> Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
  /// Paginating the catalog and queueing candidate items.
  #[default]
  List,
  /// Visiting queued candidates and emitting sink rows.
  Detail,
  /// Terminal; nothing left to do.
  Finished,
}

impl Phase {
  /// True when moving from `self` to `next` never goes backward.
  pub fn can_advance_to(self, next: Phase) -> bool {
    next >= self
  }
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Phase::List => write!(f, "list"),
      Phase::Detail => write!(f, "detail"),
      Phase::Finished => write!(f, "finished"),
    }
  }
}
