//! Tests for hyperlink formula encoding.

use super::hyperlink::{decode_hyperlink, encode_hyperlink, is_url};

#[test]
fn encode_embeds_url_twice() {
  assert_eq!(
    encode_hyperlink("https://a.example/x"),
    r#"=HYPERLINK("https://a.example/x", "https://a.example/x")"#
  );
}

#[test]
fn decode_recovers_target() {
  let cell = encode_hyperlink("https://a.example/occupations/2613/x?tab=overview");
  assert_eq!(decode_hyperlink(&cell), "https://a.example/occupations/2613/x?tab=overview");
}

#[test]
fn quotes_are_doubled_inside_the_formula() {
  let cell = encode_hyperlink(r#"https://a.example/q?"x""#);
  assert_eq!(
    cell,
    r#"=HYPERLINK("https://a.example/q?""x""", "https://a.example/q?""x""")"#
  );
  assert_eq!(decode_hyperlink(&cell), r#"https://a.example/q?"x""#);
}

#[test]
fn backslashes_are_literal() {
  let cell = encode_hyperlink(r"https://a.example/a\b");
  assert_eq!(decode_hyperlink(&cell), r"https://a.example/a\b");
}

#[test]
fn decode_passes_plain_values_through() {
  assert_eq!(decode_hyperlink(" https://plain.example "), "https://plain.example");
  assert_eq!(decode_hyperlink("No link given"), "No link given");
}

#[test]
fn url_detection() {
  assert!(is_url("https://x"));
  assert!(is_url("http://x"));
  assert!(!is_url("No link given"));
  assert!(!is_url("/relative/path"));
}
