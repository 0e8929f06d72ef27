//! Field extraction from item handles.
//!
//! Extractors never fail: every field is an `Option<String>` and absent
//! fields are rendered later as placeholders.

pub mod occupation;
#[cfg(test)]
mod occupation_test;
pub mod vacancy;
#[cfg(test)]
mod vacancy_test;

use scraper::{ElementRef, Html, Selector};

use crate::browser::ItemHandle;
use crate::types::{CandidateItem, FieldRecord};

pub use occupation::{OCCUPATION_BASE_URL, OccupationExtractor, skills_tab_url};
pub use vacancy::{VACANCY_BASE_URL, VacancyExtractor};

pub trait FieldExtractor: Send + Sync {
  /// CSS selector of one item on a listing page.
  fn item_selector(&self) -> &'static str;

  /// Candidate fields persisted in the queue, besides key and detail URL.
  fn queue_fields(&self) -> &'static [&'static str];

  /// Fields produced by [`FieldExtractor::detail`].
  fn detail_fields(&self) -> &'static [&'static str];

  fn candidate(&self, item: &ItemHandle) -> CandidateItem;

  /// Pages to load for one detail record; the first is the main page.
  fn detail_pages(&self, detail_url: &str) -> Vec<String> {
    vec![detail_url.to_string()]
  }

  /// Builds the detail record. `pages` lines up with
  /// [`FieldExtractor::detail_pages`]; `None` marks a page that failed to
  /// load. The main page is always present.
  fn detail(&self, pages: &[Option<ItemHandle>]) -> FieldRecord;

  /// Record with every detail field set to `value`.
  fn unavailable(&self, value: &str) -> FieldRecord {
    let mut record = FieldRecord::new();
    for name in self.detail_fields() {
      record.set(*name, Some(value.to_string()));
    }
    record
  }
}

/// Text content with whitespace runs collapsed.
pub(crate) fn text_of(el: ElementRef<'_>) -> String {
  el.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

pub(crate) fn first<'a>(root: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
  let selector = Selector::parse(css).ok()?;
  root.select(&selector).next()
}

pub(crate) fn all<'a>(root: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
  match Selector::parse(css) {
    Ok(selector) => root.select(&selector).collect(),
    Err(_) => Vec::new(),
  }
}

/// Trimmed text of the first match; empty text counts as absent.
pub(crate) fn first_text(root: ElementRef<'_>, css: &str) -> Option<String> {
  first(root, css).map(text_of).filter(|t| !t.is_empty())
}

/// Non-empty texts of every match joined by `sep`; absent when none.
pub(crate) fn joined_texts(root: ElementRef<'_>, css: &str, sep: &str) -> Option<String> {
  let texts: Vec<String> = all(root, css)
    .into_iter()
    .map(text_of)
    .filter(|t| !t.is_empty())
    .collect();
  (!texts.is_empty()).then(|| texts.join(sep))
}

pub(crate) fn first_attr(root: ElementRef<'_>, css: &str, attr: &str) -> Option<String> {
  first(root, css)
    .and_then(|el| el.value().attr(attr))
    .map(|v| v.trim().to_string())
    .filter(|v| !v.is_empty())
}

pub(crate) fn fragment(item: &ItemHandle) -> Html {
  Html::parse_fragment(&item.html)
}

pub(crate) fn document(item: &ItemHandle) -> Html {
  Html::parse_document(&item.html)
}

/// Resolves `href` against `base`, passing absolute URLs through.
pub(crate) fn absolute(base: &str, href: &str) -> String {
  reqwest::Url::parse(base)
    .and_then(|b| b.join(href))
    .map(|u| u.to_string())
    .unwrap_or_else(|_| href.to_string())
}
