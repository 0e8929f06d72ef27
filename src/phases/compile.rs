//! Cross-reference of occupations onto collected vacancies.
//!
//! `index` walks the occupation rows and `cursor` pages through each
//! occupation's vacancy listing, restarting at page 1 for every occupation.

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use super::PhaseMachine;
use crate::context::HarvestContext;
use crate::dedup::{DedupIndex, merge_delimited, normalize_key};
use crate::error::HarvestError;
use crate::pipeline::{CompileSpec, with_page};
use crate::sink::CellUpdate;
use crate::types::{Checkpoint, Phase, SinkRow, decode_hyperlink, is_url};

#[derive(Debug, Clone)]
struct OccupationRef {
  name: String,
  link: String,
  listing: String,
}

struct Loaded {
  occupations: Vec<OccupationRef>,
  rows: Vec<SinkRow>,
  index: DedupIndex,
  /// 1-based merge target columns.
  name_column: usize,
  link_column: usize,
}

pub struct CompileMachine {
  ctx: HarvestContext,
  spec: CompileSpec,
  loaded: Option<Loaded>,
  /// Keys of the last page seen, tagged with its occupation offset.
  last_page: Option<(usize, Vec<String>)>,
}

fn column(header: &[String], sheet: &str, name: &str) -> Result<usize, HarvestError> {
  header
    .iter()
    .position(|h| h.trim() == name)
    .ok_or_else(|| HarvestError::MissingColumn {
      sheet: sheet.to_string(),
      column: name.to_string(),
    })
}

fn cell(row: &[String], position: usize) -> String {
  row.get(position).map(|v| decode_hyperlink(v)).unwrap_or_default()
}

impl CompileMachine {
  pub fn new(ctx: HarvestContext, spec: CompileSpec) -> Self {
    Self {
      ctx,
      spec,
      loaded: None,
      last_page: None,
    }
  }

  async fn ensure_loaded(&mut self) -> Result<(), HarvestError> {
    if self.loaded.is_some() {
      return Ok(());
    }
    let sink = &self.ctx.sink;
    let spec = &self.spec;

    let source = self.ctx.require("read occupations", || sink.read_rows(spec.source_sheet)).await?;
    let occupations = match source.split_first() {
      Some((header, rows)) => {
        let name = column(header, spec.source_sheet, spec.source_name_column)?;
        let link = column(header, spec.source_sheet, spec.source_link_column)?;
        let listing = column(header, spec.source_sheet, spec.source_listing_column)?;
        rows
          .iter()
          .map(|r| OccupationRef {
            name: cell(r, name),
            link: cell(r, link),
            listing: cell(r, listing),
          })
          .collect()
      }
      None => Vec::new(),
    };

    let rows = self.ctx.require("read vacancies", || sink.read_rows(spec.target_sheet)).await?;
    let header = rows.first().cloned().unwrap_or_default();
    let key = column(&header, spec.target_sheet, spec.target_key_column)?;
    let name_column = column(&header, spec.target_sheet, spec.merge_name_column)? + 1;
    let link_column = column(&header, spec.target_sheet, spec.merge_link_column)? + 1;
    let keys: Vec<String> = rows.iter().map(|r| r.get(key).cloned().unwrap_or_default()).collect();
    let index = DedupIndex::rebuild(&keys);
    info!(occupations = occupations.len(), vacancies = index.len(), "compile inputs loaded");

    self.loaded = Some(Loaded {
      occupations,
      rows,
      index,
      name_column,
      link_column,
    });
    Ok(())
  }

  /// Merges `occupation` into every known vacancy among `keys`; returns the
  /// number of patched cells.
  async fn merge_page(&mut self, occupation: &OccupationRef, keys: &[String]) -> Result<usize, HarvestError> {
    let Some(loaded) = self.loaded.as_ref() else {
      return Ok(0);
    };
    let mut updates: Vec<CellUpdate> = Vec::new();
    for key in keys {
      let Some(row) = loaded.index.row_of(key) else {
        continue;
      };
      for (col, value) in [
        (loaded.name_column, &occupation.name),
        (loaded.link_column, &occupation.link),
      ] {
        let current = loaded
          .rows
          .get(row - 1)
          .and_then(|r| r.get(col - 1))
          .map(String::as_str)
          .unwrap_or("");
        if let Some(merged) = merge_delimited(current, value) {
          updates.push(CellUpdate::new(row, col, merged));
        }
      }
    }
    if updates.is_empty() {
      return Ok(0);
    }

    let sheet = self.spec.target_sheet;
    let sink = &self.ctx.sink;
    if self.ctx.attempt("merge occupations", || sink.batch_update(sheet, &updates)).await?.is_none() {
      warn!(occupation = %occupation.name, cells = updates.len(), "occupation merge dropped");
      return Ok(0);
    }
    if let Some(loaded) = self.loaded.as_mut() {
      for u in &updates {
        let row = &mut loaded.rows[u.cell.row - 1];
        if row.len() < u.cell.column {
          row.resize(u.cell.column, String::new());
        }
        row[u.cell.column - 1] = u.value.clone();
      }
    }
    Ok(updates.len())
  }

  #[instrument(level = "trace", skip(self))]
  async fn compile_step(&mut self, cp: &Checkpoint) -> Result<Checkpoint, HarvestError> {
    self.ensure_loaded().await?;
    let occupation = self
      .loaded
      .as_ref()
      .and_then(|l| l.occupations.get(cp.index))
      .cloned();
    let Some(occupation) = occupation else {
      info!(occupations = cp.index, "all occupations compiled");
      return Ok(cp.finish());
    };
    if !is_url(&occupation.listing) {
      debug!(occupation = %occupation.name, "no vacancy listing, skipped");
      return Ok(cp.next_outer());
    }

    let url = with_page(&occupation.listing, cp.cursor);
    let browser = &self.ctx.browser;
    let page = match self.ctx.navigation.run(&url, || browser.open_listing(&url)).await {
      Ok(page) => page,
      Err(e) => {
        warn!(occupation = %occupation.name, page = cp.cursor, error = %e, "vacancy listing unavailable, skipping occupation");
        return Ok(cp.next_outer());
      }
    };
    let keys: Vec<String> = page
      .items
      .iter()
      .filter_map(|item| self.spec.extractor.candidate(item).key)
      .map(|k| normalize_key(&k))
      .collect();
    let repeated = matches!(&self.last_page, Some((i, prev)) if *i == cp.index && *prev == keys);
    if keys.is_empty() || repeated {
      debug!(occupation = %occupation.name, page = cp.cursor, repeated, "listing ended");
      return Ok(cp.next_outer());
    }

    let merged = self.merge_page(&occupation, &keys).await?;
    info!(occupation = %occupation.name, page = cp.cursor, jobs = keys.len(), merged, "vacancy page compiled");
    self.last_page = Some((cp.index, keys));
    Ok(if page.has_next { cp.next_page() } else { cp.next_outer() })
  }
}

#[async_trait]
impl PhaseMachine for CompileMachine {
  fn name(&self) -> &str {
    "compile"
  }

  async fn step(&mut self, cp: &Checkpoint) -> Result<Checkpoint, HarvestError> {
    match cp.phase {
      Phase::Finished => Ok(cp.clone()),
      _ => self.compile_step(cp).await,
    }
  }

  async fn flush(&mut self) -> Result<(), HarvestError> {
    Ok(())
  }
}
