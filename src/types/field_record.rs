//! Flat record of extracted fields.

/// Every detail field of a candidate whose detail page could not be loaded.
pub const DETAIL_UNAVAILABLE: &str = "Failed to load detail page";

/// Placeholder for a field the extractor could not find.
pub fn missing_field(name: &str) -> String {
  format!("No {name} given")
}

/// Ordered `name -> Option<value>` pairs produced by a field extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRecord {
  fields: Vec<(String, Option<String>)>,
}

impl FieldRecord {
  pub fn new() -> Self {
    Self::default()
  }

  /// Records `value` under `name`; blank strings count as absent.
  pub fn set(&mut self, name: impl Into<String>, value: Option<String>) {
    let name = name.into();
    let value = value.filter(|v| !v.trim().is_empty());
    match self.fields.iter_mut().find(|(n, _)| *n == name) {
      Some(slot) => slot.1 = value,
      None => self.fields.push((name, value)),
    }
  }

  pub fn with(mut self, name: impl Into<String>, value: Option<String>) -> Self {
    self.set(name, value);
    self
  }

  /// Copies every present field of `other` over this record.
  pub fn merge(&mut self, other: FieldRecord) {
    for (name, value) in other.fields {
      if value.is_some() || self.get(&name).is_none() {
        self.set(name, value);
      }
    }
  }

  pub fn get(&self, name: &str) -> Option<&str> {
    self
      .fields
      .iter()
      .find(|(n, _)| n == name)
      .and_then(|(_, v)| v.as_deref())
  }

  /// Value of `name`, or its `No <name> given` placeholder.
  pub fn value_or_placeholder(&self, name: &str) -> String {
    self
      .get(name)
      .map(str::to_string)
      .unwrap_or_else(|| missing_field(name))
  }

  /// Names with no value.
  pub fn missing(&self) -> impl Iterator<Item = &str> {
    self
      .fields
      .iter()
      .filter(|(_, v)| v.is_none())
      .map(|(n, _)| n.as_str())
  }
}
