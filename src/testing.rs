//! Scripted collaborators for tests and dry runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::browser::{BrowserAgent, ItemHandle, ListingPage};
use crate::error::NavigationError;
use crate::extract::FieldExtractor;
use crate::pipeline::{Column, ColumnSource, Pipeline, PipelineKind};
use crate::types::{CandidateItem, FieldRecord};

pub const STUB_SEARCH_URL: &str = "https://catalog.test/search";

#[derive(Default)]
struct Script {
  listings: HashMap<String, ListingPage>,
  details: HashMap<String, String>,
  failures: HashMap<String, u32>,
  visits: Vec<String>,
}

/// Serves canned pages by exact URL. Unknown URLs answer 404.
#[derive(Default)]
pub struct ScriptedBrowser {
  script: Mutex<Script>,
}

impl ScriptedBrowser {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_listing(self, url: &str, items: &[&str], has_next: bool) -> Self {
    let page = ListingPage {
      url: url.to_string(),
      items: items.iter().map(|html| ItemHandle::new(*html, url)).collect(),
      has_next,
    };
    self.lock().listings.insert(url.to_string(), page);
    self
  }

  pub fn with_detail(self, url: &str, html: &str) -> Self {
    self.lock().details.insert(url.to_string(), html.to_string());
    self
  }

  /// The next `times` visits of `url` time out.
  pub fn fail_times(&self, url: &str, times: u32) {
    self.lock().failures.insert(url.to_string(), times);
  }

  pub fn visits(&self) -> Vec<String> {
    self.lock().visits.clone()
  }

  pub fn visit_count(&self, url: &str) -> usize {
    self.lock().visits.iter().filter(|v| *v == url).count()
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
    self.script.lock().unwrap_or_else(|e| e.into_inner())
  }

  fn visit(&self, url: &str) -> Result<(), NavigationError> {
    let mut script = self.lock();
    script.visits.push(url.to_string());
    if let Some(left) = script.failures.get_mut(url).filter(|n| **n > 0) {
      *left -= 1;
      return Err(NavigationError::Timeout(url.to_string()));
    }
    Ok(())
  }
}

fn not_found(url: &str) -> NavigationError {
  NavigationError::Status {
    url: url.to_string(),
    status: 404,
  }
}

#[async_trait]
impl BrowserAgent for ScriptedBrowser {
  async fn open_listing(&self, url: &str) -> Result<ListingPage, NavigationError> {
    self.visit(url)?;
    self.lock().listings.get(url).cloned().ok_or_else(|| not_found(url))
  }

  async fn open_detail(&self, url: &str) -> Result<ItemHandle, NavigationError> {
    self.visit(url)?;
    let html = self.lock().details.get(url).cloned().ok_or_else(|| not_found(url))?;
    Ok(ItemHandle::new(html, url))
  }
}

/// Items are `key|url|name|tags`; detail pages are `title|body`. Empty
/// segments are absent fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubExtractor;

fn segment(parts: &[&str], i: usize) -> Option<String> {
  parts.get(i).map(|s| s.trim()).filter(|s| !s.is_empty()).map(str::to_string)
}

impl FieldExtractor for StubExtractor {
  fn item_selector(&self) -> &'static str {
    "li"
  }

  fn queue_fields(&self) -> &'static [&'static str] {
    &["name", "tags"]
  }

  fn detail_fields(&self) -> &'static [&'static str] {
    &["title", "body"]
  }

  fn candidate(&self, item: &ItemHandle) -> CandidateItem {
    let parts: Vec<&str> = item.html.split('|').collect();
    let mut c = CandidateItem::new(segment(&parts, 0), segment(&parts, 1));
    if let Some(name) = segment(&parts, 2) {
      c = c.with_field("name", name);
    }
    if let Some(tags) = segment(&parts, 3) {
      c = c.with_field("tags", tags);
    }
    c
  }

  fn detail(&self, pages: &[Option<ItemHandle>]) -> FieldRecord {
    let Some(Some(main)) = pages.first() else {
      return FieldRecord::new();
    };
    let parts: Vec<&str> = main.html.split('|').collect();
    FieldRecord::new()
      .with("title", segment(&parts, 0))
      .with("body", segment(&parts, 1))
  }
}

/// Pipeline over [`StubExtractor`] writing `Queue`, `Records`, `Ledger`.
pub fn stub_pipeline() -> Pipeline {
  use ColumnSource::*;
  Pipeline::new(
    PipelineKind::Vacancies,
    Arc::new(StubExtractor),
    STUB_SEARCH_URL,
    vec![
      Column::new("id", Key),
      Column::new("name", Candidate("name")),
      Column::link("link", DetailUrl),
      Column::new("title", Detail("title")),
      Column::new("body", Detail("body")),
      Column::new("tags", Merge),
    ],
  )
}
