//! Deduplication index of natural keys already present in the sink.

use std::collections::HashMap;

use tracing::instrument;

/// Separator of delimiter-joined merge cells.
pub const MERGE_DELIMITER: char = ',';

/// Canonical form of a natural key.
pub fn normalize_key(key: &str) -> String {
  key.trim().to_lowercase()
}

/// Set of emitted keys mapped to the sink row holding each.
///
/// Entries are never removed: the sink itself never contracts.
#[derive(Debug, Clone, Default)]
pub struct DedupIndex {
  rows: HashMap<String, usize>,
  /// Keys added since the last [`DedupIndex::drain_pending`].
  pending: Vec<String>,
}

impl DedupIndex {
  pub fn new() -> Self {
    Self::default()
  }

  /// Builds the index from a full identifier column, header at row 1.
  /// Blank cells are skipped; on duplicates the first row wins.
  #[instrument(level = "trace", skip(column))]
  pub fn rebuild(column: &[String]) -> Self {
    let mut index = DedupIndex::new();
    for (i, value) in column.iter().enumerate().skip(1) {
      let key = normalize_key(value);
      if key.is_empty() {
        continue;
      }
      index.rows.entry(key).or_insert(i + 1);
    }
    index
  }

  pub fn contains(&self, key: &str) -> bool {
    self.rows.contains_key(&normalize_key(key))
  }

  /// Row number holding `key`, if emitted.
  pub fn row_of(&self, key: &str) -> Option<usize> {
    self.rows.get(&normalize_key(key)).copied()
  }

  /// Records `key` at `row`. Call only after the append succeeded.
  pub fn add(&mut self, key: &str, row: usize) {
    let key = normalize_key(key);
    if key.is_empty() {
      return;
    }
    if let std::collections::hash_map::Entry::Vacant(e) = self.rows.entry(key.clone()) {
      e.insert(row);
      self.pending.push(key);
    }
  }

  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  /// Takes the keys added since the previous drain.
  pub fn drain_pending(&mut self) -> Vec<String> {
    std::mem::take(&mut self.pending)
  }
}

/// Delimiter-joined set insert: returns the new cell value, or `None` when
/// `value` is already a member (or blank).
pub fn merge_delimited(existing: &str, value: &str) -> Option<String> {
  let value = value.trim();
  if value.is_empty() {
    return None;
  }
  let existing = existing.trim();
  if existing.split(MERGE_DELIMITER).any(|item| item.trim() == value) {
    return None;
  }
  if existing.is_empty() {
    Some(value.to_string())
  } else {
    Some(format!("{existing}{MERGE_DELIMITER}{value}"))
  }
}
