//! In-process sink with fault injection.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{CellUpdate, Sink};
use crate::error::SinkError;
use crate::types::{CellRef, SinkRow};

/// Operation kinds faults can be queued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkOp {
  ReadCell,
  WriteCell,
  Append,
  BatchUpdate,
  ReadRows,
  Clear,
}

#[derive(Default)]
struct Inner {
  sheets: HashMap<String, Vec<SinkRow>>,
  faults: HashMap<SinkOp, VecDeque<SinkError>>,
  calls: HashMap<SinkOp, usize>,
  /// Every `write_cell` as (sheet, cell, value), in order.
  writes: Vec<(String, CellRef, String)>,
}

/// Worksheets held in memory. Missing worksheets read as empty.
#[derive(Default)]
pub struct MemorySink {
  inner: Mutex<Inner>,
}

impl MemorySink {
  pub fn new() -> Self {
    Self::default()
  }

  /// Replaces the content of `sheet`.
  pub fn seed(&self, sheet: &str, rows: Vec<SinkRow>) {
    self.lock().sheets.insert(sheet.to_string(), rows);
  }

  /// Queues `errors` to be returned, in order, by the next calls of `op`.
  pub fn fail_next(&self, op: SinkOp, errors: Vec<SinkError>) {
    self.lock().faults.entry(op).or_default().extend(errors);
  }

  pub fn rows(&self, sheet: &str) -> Vec<SinkRow> {
    self.lock().sheets.get(sheet).cloned().unwrap_or_default()
  }

  pub fn cell(&self, sheet: &str, cell: CellRef) -> Option<String> {
    let inner = self.lock();
    get_cell(inner.sheets.get(sheet), cell)
  }

  /// Number of calls made for `op`, failed ones included.
  pub fn calls(&self, op: SinkOp) -> usize {
    self.lock().calls.get(&op).copied().unwrap_or(0)
  }

  /// Values written to `cell` of `sheet`, oldest first.
  pub fn writes_to(&self, sheet: &str, cell: CellRef) -> Vec<String> {
    self
      .lock()
      .writes
      .iter()
      .filter(|(s, c, _)| s == sheet && *c == cell)
      .map(|(_, _, v)| v.clone())
      .collect()
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(|p| p.into_inner())
  }

  fn begin(&self, op: SinkOp) -> Result<std::sync::MutexGuard<'_, Inner>, SinkError> {
    let mut inner = self.lock();
    *inner.calls.entry(op).or_default() += 1;
    if let Some(e) = inner.faults.get_mut(&op).and_then(VecDeque::pop_front) {
      return Err(e);
    }
    Ok(inner)
  }
}

fn get_cell(rows: Option<&Vec<SinkRow>>, cell: CellRef) -> Option<String> {
  rows
    .and_then(|r| r.get(cell.row - 1))
    .and_then(|r| r.get(cell.column - 1))
    .filter(|v| !v.is_empty())
    .cloned()
}

/// Writes `value` at `cell`, growing the grid as needed. Shared with the
/// csv backend.
pub(crate) fn put_cell(rows: &mut Vec<SinkRow>, cell: CellRef, value: &str) {
  if rows.len() < cell.row {
    rows.resize_with(cell.row, Vec::new);
  }
  let row = &mut rows[cell.row - 1];
  if row.len() < cell.column {
    row.resize(cell.column, String::new());
  }
  row[cell.column - 1] = value.to_string();
}

/// Index after the last row holding any non-empty cell.
pub(crate) fn used_rows(rows: &[SinkRow]) -> usize {
  rows
    .iter()
    .rposition(|r| r.iter().any(|c| !c.is_empty()))
    .map(|i| i + 1)
    .unwrap_or(0)
}

/// Appends after the last used row and returns the first new row number.
pub(crate) fn append_after_used(rows: &mut Vec<SinkRow>, new_rows: &[SinkRow]) -> usize {
  let used = used_rows(rows);
  rows.truncate(used);
  rows.extend(new_rows.iter().cloned());
  used + 1
}

#[async_trait]
impl Sink for MemorySink {
  async fn read_cell(&self, sheet: &str, cell: CellRef) -> Result<Option<String>, SinkError> {
    let inner = self.begin(SinkOp::ReadCell)?;
    Ok(get_cell(inner.sheets.get(sheet), cell))
  }

  async fn write_cell(&self, sheet: &str, cell: CellRef, value: &str) -> Result<(), SinkError> {
    let mut inner = self.begin(SinkOp::WriteCell)?;
    inner.writes.push((sheet.to_string(), cell, value.to_string()));
    put_cell(inner.sheets.entry(sheet.to_string()).or_default(), cell, value);
    Ok(())
  }

  async fn append_rows(&self, sheet: &str, rows: &[SinkRow]) -> Result<usize, SinkError> {
    let mut inner = self.begin(SinkOp::Append)?;
    let grid = inner.sheets.entry(sheet.to_string()).or_default();
    Ok(append_after_used(grid, rows))
  }

  async fn batch_update(&self, sheet: &str, updates: &[CellUpdate]) -> Result<(), SinkError> {
    let mut inner = self.begin(SinkOp::BatchUpdate)?;
    let grid = inner.sheets.entry(sheet.to_string()).or_default();
    for u in updates {
      put_cell(grid, u.cell, &u.value);
    }
    Ok(())
  }

  async fn read_rows(&self, sheet: &str) -> Result<Vec<SinkRow>, SinkError> {
    let inner = self.begin(SinkOp::ReadRows)?;
    let rows = inner.sheets.get(sheet).cloned().unwrap_or_default();
    let used = used_rows(&rows);
    Ok(rows.into_iter().take(used).collect())
  }

  async fn clear(&self, sheet: &str) -> Result<(), SinkError> {
    let mut inner = self.begin(SinkOp::Clear)?;
    inner.sheets.insert(sheet.to_string(), Vec::new());
    Ok(())
  }
}
