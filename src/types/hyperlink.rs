//! Formula-style hyperlink cells: `=HYPERLINK("<url>", "<text>")`.

use once_cell::sync::Lazy;
use regex::Regex;

static HYPERLINK_RE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r#"^=HYPERLINK\("((?:[^"]|"")+)"\s*,\s*"(?:[^"]|"")*"\)$"#).expect("valid regex")
});

/// Encodes `url` as a hyperlink formula whose display text is the url itself.
/// Quotes inside formula strings are doubled.
pub fn encode_hyperlink(url: &str) -> String {
  let escaped = url.replace('"', "\"\"");
  format!("=HYPERLINK(\"{escaped}\", \"{escaped}\")")
}

/// Returns the target of a hyperlink formula, or the value unchanged when it
/// is not one.
pub fn decode_hyperlink(cell: &str) -> String {
  let trimmed = cell.trim();
  match HYPERLINK_RE.captures(trimmed) {
    Some(c) => c[1].replace("\"\"", "\""),
    None => trimmed.to_string(),
  }
}

/// True for values that look like navigable URLs.
pub fn is_url(value: &str) -> bool {
  let v = value.trim_start();
  v.starts_with("http://") || v.starts_with("https://")
}
