//! Append-oriented tabular sink addressed by worksheet name.

mod csv_dir;
mod memory;
mod sheets;

use async_trait::async_trait;

use crate::error::SinkError;
use crate::types::{CellRef, SinkRow};

pub use csv_dir::CsvSink;
pub use memory::{MemorySink, SinkOp};
pub use sheets::SheetsSink;

/// One cell patch of a batch update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellUpdate {
  pub cell: CellRef,
  pub value: String,
}

impl CellUpdate {
  pub fn new(row: usize, column: usize, value: impl Into<String>) -> Self {
    Self {
      cell: CellRef::new(row, column),
      value: value.into(),
    }
  }
}

/// External row store. Every method may fail transiently; callers wrap
/// them in [`crate::backoff::BackoffExecutor`].
#[async_trait]
pub trait Sink: Send + Sync {
  /// Value of one cell; `None` when empty or out of range.
  async fn read_cell(&self, sheet: &str, cell: CellRef) -> Result<Option<String>, SinkError>;

  async fn write_cell(&self, sheet: &str, cell: CellRef, value: &str) -> Result<(), SinkError>;

  /// Appends rows after the last non-empty row; returns the 1-based row
  /// number of the first appended row.
  async fn append_rows(&self, sheet: &str, rows: &[SinkRow]) -> Result<usize, SinkError>;

  /// Patches individual cells without rewriting whole rows.
  async fn batch_update(&self, sheet: &str, updates: &[CellUpdate]) -> Result<(), SinkError>;

  /// Every row of the worksheet, header included.
  async fn read_rows(&self, sheet: &str) -> Result<Vec<SinkRow>, SinkError>;

  async fn clear(&self, sheet: &str) -> Result<(), SinkError>;

  /// Creates `sheet` when the backend has no such worksheet. Backends that
  /// create worksheets on first write keep this default.
  async fn ensure_worksheet(&self, _sheet: &str) -> Result<(), SinkError> {
    Ok(())
  }

  async fn append_row(&self, sheet: &str, row: &[String]) -> Result<usize, SinkError> {
    self.append_rows(sheet, &[row.to_vec()]).await
  }

  /// One column (1-based) across all rows, header included; short rows
  /// yield empty strings.
  async fn read_column(&self, sheet: &str, column: usize) -> Result<Vec<String>, SinkError> {
    let rows = self.read_rows(sheet).await?;
    Ok(
      rows
        .into_iter()
        .map(|r| r.get(column.saturating_sub(1)).cloned().unwrap_or_default())
        .collect(),
    )
  }

  /// First row of the worksheet.
  async fn read_header(&self, sheet: &str) -> Result<Vec<String>, SinkError> {
    Ok(self.read_rows(sheet).await?.into_iter().next().unwrap_or_default())
  }
}
