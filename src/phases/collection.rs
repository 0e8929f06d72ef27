//! LIST → DETAIL → FINISHED collection over one catalog.

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use super::PhaseMachine;
use crate::context::HarvestContext;
use crate::dedup::{DedupIndex, merge_delimited};
use crate::error::HarvestError;
use crate::pipeline::Pipeline;
use crate::sink::CellUpdate;
use crate::types::{CandidateItem, CellRef, Checkpoint, DETAIL_UNAVAILABLE, FieldRecord, Phase, SinkRow};

/// Consecutive unloadable listing pages that end the LIST phase.
pub const MAX_FAILED_PAGES: u32 = 3;

/// Target worksheet state loaded once per execution.
struct Target {
  header: Vec<String>,
  index: DedupIndex,
}

impl Target {
  fn column_of(&self, header: &str) -> Option<usize> {
    self.header.iter().position(|h| h.trim() == header).map(|i| i + 1)
  }
}

pub struct CollectionMachine {
  ctx: HarvestContext,
  pipeline: Pipeline,
  queue: Option<Vec<CandidateItem>>,
  target: Option<Target>,
}

impl CollectionMachine {
  pub fn new(ctx: HarvestContext, pipeline: Pipeline) -> Self {
    Self {
      ctx,
      pipeline,
      queue: None,
      target: None,
    }
  }

  /// Clears the queue worksheet and writes its header.
  async fn reset_queue(&self) -> Result<(), HarvestError> {
    let sheet = self.pipeline.queue_sheet;
    let sink = &self.ctx.sink;
    self.ctx.require("clear queue", || sink.clear(sheet)).await?;
    let header = vec![CandidateItem::queue_header(self.pipeline.extractor.queue_fields())];
    self.ctx.require("write queue header", || sink.append_rows(sheet, &header)).await?;
    info!(sheet, "candidate queue reset");
    Ok(())
  }

  #[instrument(level = "trace", skip(self), fields(pipeline = %self.pipeline.kind))]
  async fn list_step(&mut self, cp: &Checkpoint) -> Result<Checkpoint, HarvestError> {
    if cp.cursor == 1 && cp.index == 0 {
      self.reset_queue().await?;
    }
    let url = self.pipeline.listing_url(cp.cursor);
    let browser = &self.ctx.browser;
    let page = match self.ctx.navigation.run(&url, || browser.open_listing(&url)).await {
      Ok(page) => page,
      Err(e) => {
        if cp.failed_pages + 1 >= MAX_FAILED_PAGES {
          warn!(page = cp.cursor, error = %e, "listing unreachable, ending list phase");
          return Ok(cp.enter_detail());
        }
        warn!(page = cp.cursor, failed = cp.failed_pages + 1, error = %e, "listing page skipped");
        return Ok(cp.skip_page());
      }
    };

    let extractor = &self.pipeline.extractor;
    let rows: Vec<SinkRow> = page
      .items
      .iter()
      .map(|item| extractor.candidate(item).to_queue_row(extractor.queue_fields()))
      .collect();
    if !rows.is_empty() {
      let sheet = self.pipeline.queue_sheet;
      let sink = &self.ctx.sink;
      if self.ctx.attempt("append candidates", || sink.append_rows(sheet, &rows)).await?.is_none() {
        warn!(page = cp.cursor, items = rows.len(), "candidate page dropped");
      }
    }
    info!(page = cp.cursor, items = rows.len(), has_next = page.has_next, "listing page collected");

    if page.has_next {
      Ok(cp.next_page())
    } else {
      info!(pages = cp.cursor, "catalog exhausted, entering detail phase");
      Ok(cp.enter_detail())
    }
  }

  async fn ensure_loaded(&mut self) -> Result<(), HarvestError> {
    let sink = &self.ctx.sink;
    if self.queue.is_none() {
      let sheet = self.pipeline.queue_sheet;
      let mut rows = self.ctx.require("read queue", || sink.read_rows(sheet)).await?.into_iter();
      let header = rows.next().unwrap_or_default();
      let items: Vec<CandidateItem> = rows
        .filter_map(|row| CandidateItem::from_queue_row(&header, &row))
        .collect();
      info!(sheet, candidates = items.len(), "candidate queue loaded");
      self.queue = Some(items);
    }
    if self.target.is_none() {
      let sheet = self.pipeline.target_sheet;
      let Some((_, key_header)) = self.pipeline.key_column() else {
        return Err(HarvestError::MissingColumn {
          sheet: sheet.to_string(),
          column: "natural key".to_string(),
        });
      };
      let rows = self.ctx.require("read target", || sink.read_rows(sheet)).await?;
      let header = match rows.first() {
        Some(h) if h.iter().any(|c| !c.trim().is_empty()) => h.clone(),
        _ => {
          let header = vec![self.pipeline.header()];
          self.ctx.require("write target header", || sink.append_rows(sheet, &header)).await?;
          self.pipeline.header()
        }
      };
      let Some(key_pos) = header.iter().position(|h| h.trim() == key_header) else {
        return Err(HarvestError::MissingColumn {
          sheet: sheet.to_string(),
          column: key_header.to_string(),
        });
      };
      let keys: Vec<String> = rows
        .iter()
        .map(|r| r.get(key_pos).cloned().unwrap_or_default())
        .collect();
      let index = DedupIndex::rebuild(&keys);
      info!(sheet, keys = index.len(), "dedup index rebuilt");
      self.target = Some(Target { header, index });
    }
    Ok(())
  }

  /// Loads the detail pages of `item`. A missing URL or an unloadable main
  /// page yields the unavailable sentinel for every detail field.
  async fn fetch_detail(&self, item: &CandidateItem) -> FieldRecord {
    let extractor = &self.pipeline.extractor;
    let Some(url) = item.detail_url.as_deref() else {
      warn!(key = ?item.key, "candidate has no detail url, emitting sentinels");
      return extractor.unavailable(DETAIL_UNAVAILABLE);
    };
    let browser = &self.ctx.browser;
    let urls = extractor.detail_pages(url);
    let mut pages = Vec::with_capacity(urls.len());
    for (i, page_url) in urls.iter().enumerate() {
      match self.ctx.navigation.run(page_url, || browser.open_detail(page_url)).await {
        Ok(page) => pages.push(Some(page)),
        Err(e) if i == 0 => {
          warn!(key = ?item.key, url = %page_url, error = %e, "detail page unavailable, emitting sentinels");
          return extractor.unavailable(DETAIL_UNAVAILABLE);
        }
        Err(e) => {
          warn!(key = ?item.key, url = %page_url, error = %e, "secondary detail page unavailable");
          pages.push(None);
        }
      }
    }
    let record = extractor.detail(&pages);
    let missing: Vec<&str> = record.missing().collect();
    if !missing.is_empty() {
      debug!(key = ?item.key, ?missing, "fields absent");
    }
    record
  }

  /// Row already holding the key of `item`, if any.
  fn seen_row(&self, item: &CandidateItem) -> Option<usize> {
    let target = self.target.as_ref()?;
    target.index.row_of(item.key.as_deref()?)
  }

  /// Appends the row of a first-seen key; the key is indexed only once the
  /// append succeeded.
  async fn append(&mut self, item: &CandidateItem, record: &FieldRecord) -> Result<(), HarvestError> {
    let sheet = self.pipeline.target_sheet;
    let sink = &self.ctx.sink;
    let row = vec![self.pipeline.build_row(item, record)];
    match self.ctx.attempt("append record", || sink.append_rows(sheet, &row)).await? {
      Some(at) => {
        debug!(key = ?item.key, row = at, "record appended");
        if let (Some(target), Some(key)) = (self.target.as_mut(), item.key.as_deref()) {
          target.index.add(key, at);
        }
      }
      None => warn!(key = ?item.key, "record dropped"),
    }
    Ok(())
  }

  async fn merge_into(&self, row: usize, item: &CandidateItem) -> Result<(), HarvestError> {
    let Some(target) = self.target.as_ref() else {
      return Ok(());
    };
    let sheet = self.pipeline.target_sheet;
    let sink = &self.ctx.sink;
    let mut updates = Vec::new();
    for (_, header) in self.pipeline.merge_columns() {
      let (Some(value), Some(column)) = (item.field(header), target.column_of(header)) else {
        continue;
      };
      let cell = CellRef::new(row, column);
      let Some(current) = self.ctx.attempt("read merge cell", || sink.read_cell(sheet, cell)).await? else {
        warn!(key = ?item.key, %cell, "merge cell unreadable, skipped");
        continue;
      };
      if let Some(merged) = merge_delimited(current.as_deref().unwrap_or(""), value) {
        updates.push(CellUpdate { cell, value: merged });
      }
    }
    if updates.is_empty() {
      debug!(key = ?item.key, row, "duplicate key, nothing to merge");
      return Ok(());
    }
    if self.ctx.attempt("merge cells", || sink.batch_update(sheet, &updates)).await?.is_none() {
      warn!(key = ?item.key, row, "merge dropped");
    } else {
      info!(key = ?item.key, row, cells = updates.len(), "duplicate key merged");
    }
    Ok(())
  }

  #[instrument(level = "trace", skip(self), fields(pipeline = %self.pipeline.kind))]
  async fn detail_step(&mut self, cp: &Checkpoint) -> Result<Checkpoint, HarvestError> {
    self.ensure_loaded().await?;
    let item = self.queue.as_ref().and_then(|q| q.get(cp.index)).cloned();
    let Some(item) = item else {
      info!(processed = cp.index, "candidate queue exhausted");
      return Ok(cp.finish());
    };
    if let Some(row) = self.seen_row(&item) {
      self.merge_into(row, &item).await?;
      return Ok(cp.next_item());
    }
    let record = self.fetch_detail(&item).await;
    self.append(&item, &record).await?;
    Ok(cp.next_item())
  }
}

#[async_trait]
impl PhaseMachine for CollectionMachine {
  fn name(&self) -> &str {
    self.pipeline.kind.slot().name
  }

  async fn step(&mut self, cp: &Checkpoint) -> Result<Checkpoint, HarvestError> {
    match cp.phase {
      Phase::List => self.list_step(cp).await,
      Phase::Detail => self.detail_step(cp).await,
      Phase::Finished => Ok(cp.clone()),
    }
  }

  /// Appends keys first emitted in this execution to the ledger worksheet.
  async fn flush(&mut self) -> Result<(), HarvestError> {
    let Some(target) = self.target.as_mut() else {
      return Ok(());
    };
    let keys = target.index.drain_pending();
    if keys.is_empty() {
      return Ok(());
    }
    let sheet = self.pipeline.ledger_sheet;
    let sink = &self.ctx.sink;
    let rows: Vec<SinkRow> = keys.into_iter().map(|k| vec![k]).collect();
    match self.ctx.attempt("flush ledger", || sink.append_rows(sheet, &rows)).await? {
      Some(_) => info!(sheet, keys = rows.len(), "dedup ledger flushed"),
      None => warn!(sheet, keys = rows.len(), "dedup ledger flush dropped"),
    }
    Ok(())
  }
}
