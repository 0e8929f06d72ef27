//! Directory of CSV files, one per worksheet.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use super::memory::{append_after_used, put_cell, used_rows};
use super::{CellUpdate, Sink};
use crate::error::SinkError;
use crate::types::{CellRef, SinkRow};

/// Local sink for offline runs. Each mutation rewrites the worksheet file
/// through a temp file and rename, so a kill never leaves half a file.
pub struct CsvSink {
  dir: PathBuf,
  lock: Mutex<()>,
}

impl CsvSink {
  pub fn new(dir: impl Into<PathBuf>) -> Result<Self, SinkError> {
    let dir = dir.into();
    std::fs::create_dir_all(&dir)?;
    Ok(Self {
      dir,
      lock: Mutex::new(()),
    })
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  pub(crate) fn path(&self, sheet: &str) -> PathBuf {
    let safe: String = sheet
      .chars()
      .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
      .collect();
    self.dir.join(format!("{safe}.csv"))
  }

  fn load(&self, sheet: &str) -> Result<Vec<SinkRow>, SinkError> {
    let path = self.path(sheet);
    if !path.exists() {
      return Ok(Vec::new());
    }
    let mut reader = csv::ReaderBuilder::new()
      .has_headers(false)
      .flexible(true)
      .from_path(&path)?;
    let mut rows = Vec::new();
    for record in reader.records() {
      rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok(rows)
  }

  #[instrument(level = "trace", skip(self, rows))]
  fn store(&self, sheet: &str, rows: &[SinkRow]) -> Result<(), SinkError> {
    let path = self.path(sheet);
    let tmp = path.with_extension("csv.tmp");
    {
      let mut writer = csv::WriterBuilder::new().flexible(true).from_path(&tmp)?;
      for row in rows {
        // An empty record would be read back as a skipped line.
        if row.is_empty() {
          writer.write_record([""])?;
        } else {
          writer.write_record(row)?;
        }
      }
      writer.flush()?;
    }
    std::fs::rename(&tmp, &path)?;
    debug!(sheet, rows = rows.len(), "worksheet written");
    Ok(())
  }
}

#[async_trait]
impl Sink for CsvSink {
  async fn read_cell(&self, sheet: &str, cell: CellRef) -> Result<Option<String>, SinkError> {
    let _guard = self.lock.lock().await;
    let rows = self.load(sheet)?;
    Ok(
      rows
        .get(cell.row - 1)
        .and_then(|r| r.get(cell.column - 1))
        .filter(|v| !v.is_empty())
        .cloned(),
    )
  }

  async fn write_cell(&self, sheet: &str, cell: CellRef, value: &str) -> Result<(), SinkError> {
    let _guard = self.lock.lock().await;
    let mut rows = self.load(sheet)?;
    put_cell(&mut rows, cell, value);
    self.store(sheet, &rows)
  }

  async fn append_rows(&self, sheet: &str, new_rows: &[SinkRow]) -> Result<usize, SinkError> {
    let _guard = self.lock.lock().await;
    let mut rows = self.load(sheet)?;
    let first = append_after_used(&mut rows, new_rows);
    self.store(sheet, &rows)?;
    Ok(first)
  }

  async fn batch_update(&self, sheet: &str, updates: &[CellUpdate]) -> Result<(), SinkError> {
    let _guard = self.lock.lock().await;
    let mut rows = self.load(sheet)?;
    for u in updates {
      put_cell(&mut rows, u.cell, &u.value);
    }
    self.store(sheet, &rows)
  }

  async fn read_rows(&self, sheet: &str) -> Result<Vec<SinkRow>, SinkError> {
    let _guard = self.lock.lock().await;
    let mut rows = self.load(sheet)?;
    rows.truncate(used_rows(&rows));
    Ok(rows)
  }

  async fn clear(&self, sheet: &str) -> Result<(), SinkError> {
    let _guard = self.lock.lock().await;
    self.store(sheet, &[])
  }
}
