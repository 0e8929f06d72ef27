//! Candidate item captured while listing, revisited while detailing.

use std::collections::BTreeMap;

/// Header of the natural key column in a candidate queue worksheet.
pub const QUEUE_KEY_COLUMN: &str = "natural key";
/// Header of the detail URL column in a candidate queue worksheet.
pub const QUEUE_URL_COLUMN: &str = "detail url";

/// Lightweight reference to one catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CandidateItem {
  /// Natural key (fingerprint); `None` when the listing carried none.
  pub key: Option<String>,
  /// Follow-up URL of the detail page.
  pub detail_url: Option<String>,
  /// Listing-level fields carried through to the emitted row.
  pub fields: BTreeMap<String, String>,
}

impl CandidateItem {
  pub fn new(key: Option<String>, detail_url: Option<String>) -> Self {
    Self {
      key: key.filter(|k| !k.trim().is_empty()),
      detail_url: detail_url.filter(|u| !u.trim().is_empty()),
      fields: BTreeMap::new(),
    }
  }

  pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.fields.insert(name.into(), value.into());
    self
  }

  pub fn field(&self, name: &str) -> Option<&str> {
    self.fields.get(name).map(String::as_str)
  }

  /// Queue worksheet header for candidates carrying `field_names`.
  pub fn queue_header(field_names: &[&str]) -> Vec<String> {
    let mut header = vec![QUEUE_KEY_COLUMN.to_string(), QUEUE_URL_COLUMN.to_string()];
    header.extend(field_names.iter().map(|f| f.to_string()));
    header
  }

  /// Serializes into a queue row matching [`CandidateItem::queue_header`].
  pub fn to_queue_row(&self, field_names: &[&str]) -> Vec<String> {
    let mut row = vec![
      self.key.clone().unwrap_or_default(),
      self.detail_url.clone().unwrap_or_default(),
    ];
    row.extend(
      field_names
        .iter()
        .map(|f| self.fields.get(*f).cloned().unwrap_or_default()),
    );
    row
  }

  /// Rebuilds a candidate from a queue row, addressing cells by header name.
  /// Returns `None` for rows that carry neither a key nor a URL nor any field.
  pub fn from_queue_row(header: &[String], row: &[String]) -> Option<Self> {
    let mut item = CandidateItem::default();
    for (i, name) in header.iter().enumerate() {
      let value = row.get(i).map(|v| v.trim()).unwrap_or("");
      if value.is_empty() {
        continue;
      }
      match name.as_str() {
        QUEUE_KEY_COLUMN => item.key = Some(value.to_string()),
        QUEUE_URL_COLUMN => item.detail_url = Some(value.to_string()),
        other => {
          item.fields.insert(other.to_string(), value.to_string());
        }
      }
    }
    let empty = item.key.is_none() && item.detail_url.is_none() && item.fields.is_empty();
    (!empty).then_some(item)
  }
}
