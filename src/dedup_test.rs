//! Tests for `DedupIndex` and delimiter-set merging.

use proptest::prelude::*;

use crate::dedup::{DedupIndex, merge_delimited, normalize_key};

fn column(values: &[&str]) -> Vec<String> {
  values.iter().map(|v| v.to_string()).collect()
}

#[test]
fn rebuild_maps_keys_to_rows_skipping_header() {
  let idx = DedupIndex::rebuild(&column(&["job code", "A1", "", "b2", "a1"]));
  assert_eq!(idx.len(), 2);
  assert_eq!(idx.row_of("a1"), Some(2));
  assert_eq!(idx.row_of("B2"), Some(4));
  assert!(!idx.contains("job code"));
}

#[test]
fn keys_are_normalized() {
  assert_eq!(normalize_key("  AbC "), "abc");
  let mut idx = DedupIndex::new();
  idx.add(" X9 ", 5);
  assert!(idx.contains("x9"));
}

#[test]
fn add_keeps_first_row_and_tracks_pending_once() {
  let mut idx = DedupIndex::new();
  idx.add("k", 2);
  idx.add("K", 9);
  idx.add("", 3);
  assert_eq!(idx.row_of("k"), Some(2));
  assert_eq!(idx.drain_pending(), vec!["k"]);
  assert!(idx.drain_pending().is_empty());
  assert!(idx.contains("k"));
}

#[test]
fn rebuilt_keys_are_not_pending() {
  let mut idx = DedupIndex::rebuild(&column(&["h", "a"]));
  assert!(idx.drain_pending().is_empty());
}

#[test]
fn merge_inserts_into_empty_and_existing() {
  assert_eq!(merge_delimited("", "Nurse").as_deref(), Some("Nurse"));
  assert_eq!(merge_delimited("Nurse", "Chef").as_deref(), Some("Nurse,Chef"));
}

#[test]
fn merge_skips_members_and_blanks() {
  assert_eq!(merge_delimited("Nurse, Chef", "Chef"), None);
  assert_eq!(merge_delimited("Nurse", "  "), None);
}

proptest! {
  #[test]
  fn merge_is_idempotent(existing in "[a-z]{0,6}(,[a-z]{1,6}){0,4}", value in "[a-z]{1,6}") {
    let once = merge_delimited(&existing, &value).unwrap_or_else(|| existing.clone());
    prop_assert!(once.split(',').any(|s| s.trim() == value));
    prop_assert_eq!(merge_delimited(&once, &value), None);
  }
}
