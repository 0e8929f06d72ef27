//! Cell addressing in A1 notation.

use std::fmt;
use std::str::FromStr;

/// 1-based (row, column) address within one worksheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
  pub row: usize,
  pub column: usize,
}

impl CellRef {
  pub fn new(row: usize, column: usize) -> Self {
    Self { row, column }
  }
}

/// Converts a 1-based column number to its letter form (1 -> A, 27 -> AA).
pub fn column_letters(mut column: usize) -> String {
  let mut letters = Vec::new();
  while column > 0 {
    let rem = (column - 1) % 26;
    letters.push(b'A' + rem as u8);
    column = (column - 1) / 26;
  }
  letters.reverse();
  String::from_utf8(letters).unwrap_or_default()
}

/// Parses column letters back to a 1-based number.
pub fn column_number(letters: &str) -> Option<usize> {
  if letters.is_empty() {
    return None;
  }
  letters.chars().try_fold(0usize, |acc, c| {
    let c = c.to_ascii_uppercase();
    c.is_ascii_uppercase()
      .then(|| acc * 26 + (c as usize - 'A' as usize + 1))
  })
}

impl fmt::Display for CellRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}{}", column_letters(self.column), self.row)
  }
}

impl FromStr for CellRef {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim();
    let split = s
      .find(|c: char| c.is_ascii_digit())
      .ok_or_else(|| format!("no row number in cell reference: {s}"))?;
    let (letters, digits) = s.split_at(split);
    let column = column_number(letters).ok_or_else(|| format!("bad column in cell reference: {s}"))?;
    let row: usize = digits
      .parse()
      .map_err(|_| format!("bad row in cell reference: {s}"))?;
    if row == 0 {
      return Err(format!("row must be 1-based: {s}"));
    }
    Ok(CellRef { row, column })
  }
}
