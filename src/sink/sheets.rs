//! Google Sheets v4 REST backend.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, Method, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::{CellUpdate, Sink};
use crate::error::SinkError;
use crate::types::{CellRef, SinkRow};

/// Public endpoint of the Sheets API.
pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

static RANGE_ROW_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"!\$?[A-Za-z]+\$?(\d+)").expect("valid regex"));

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  range: Option<String>,
  #[serde(default)]
  values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
  updates: AppendUpdates,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendUpdates {
  updated_range: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateRequest {
  value_input_option: &'static str,
  data: Vec<ValueRange>,
}

/// Sheets backend authenticated with a bearer access token.
pub struct SheetsSink {
  client: Client,
  base: String,
  spreadsheet_id: String,
  token: String,
}

impl SheetsSink {
  pub fn new(spreadsheet_id: impl Into<String>, token: impl Into<String>) -> Result<Self, SinkError> {
    Self::with_base(SHEETS_API_BASE, spreadsheet_id, token)
  }

  /// Same as [`SheetsSink::new`] against another API root.
  pub fn with_base(
    base: impl Into<String>,
    spreadsheet_id: impl Into<String>,
    token: impl Into<String>,
  ) -> Result<Self, SinkError> {
    let client = Client::builder()
      .timeout(Duration::from_secs(60))
      .build()
      .map_err(|e| SinkError::Transport(e.to_string()))?;
    Ok(Self {
      client,
      base: base.into(),
      spreadsheet_id: spreadsheet_id.into(),
      token: token.into(),
    })
  }

  fn url(&self, last_segment: &str) -> Result<Url, SinkError> {
    let mut url = Url::parse(&self.base).map_err(|e| SinkError::Malformed(e.to_string()))?;
    url
      .path_segments_mut()
      .map_err(|_| SinkError::Malformed(format!("base url cannot hold a path: {}", self.base)))?
      .push(&self.spreadsheet_id)
      .push(last_segment);
    Ok(url)
  }

  /// `{base}/{id}:{method}` for spreadsheet-level methods.
  pub(crate) fn spreadsheet_url(&self, method: &str) -> Result<Url, SinkError> {
    let mut url = Url::parse(&self.base).map_err(|e| SinkError::Malformed(e.to_string()))?;
    url
      .path_segments_mut()
      .map_err(|_| SinkError::Malformed(format!("base url cannot hold a path: {}", self.base)))?
      .push(&format!("{}:{method}", self.spreadsheet_id));
    Ok(url)
  }

  pub(crate) fn values_url(&self, range: &str, action: Option<&str>) -> Result<Url, SinkError> {
    let mut url = self.url("values")?;
    let segment = match action {
      Some(a) => format!("{range}:{a}"),
      None => range.to_string(),
    };
    url
      .path_segments_mut()
      .map_err(|_| SinkError::Malformed(self.base.clone()))?
      .push(&segment);
    Ok(url)
  }

  #[instrument(level = "trace", skip(self, body))]
  async fn send<B: Serialize + ?Sized>(
    &self,
    method: Method,
    url: Url,
    query: &[(&str, &str)],
    body: Option<&B>,
  ) -> Result<Value, SinkError> {
    let mut request = self
      .client
      .request(method, url)
      .bearer_auth(&self.token)
      .query(query);
    if let Some(b) = body {
      request = request.json(b);
    }
    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
      return Err(classify_failure(status.as_u16(), &text));
    }
    if text.trim().is_empty() {
      return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| SinkError::Malformed(e.to_string()))
  }

  /// Runs `op`; when the worksheet is missing, adds it and runs `op` once more.
  async fn creating_missing<T, F, Fut>(&self, sheet: &str, op: F) -> Result<T, SinkError>
  where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, SinkError>> + Send,
    T: Send,
  {
    match op().await {
      Err(SinkError::WorksheetNotFound(_)) => {
        self.ensure_worksheet(sheet).await?;
        op().await
      }
      other => other,
    }
  }

  async fn get_values(&self, range: String) -> Result<Vec<SinkRow>, SinkError> {
    let url = self.values_url(&range, None)?;
    match self.send::<()>(Method::GET, url, &[], None).await {
      Ok(body) => parse_rows(body),
      Err(SinkError::WorksheetNotFound(_)) => Ok(Vec::new()),
      Err(e) => Err(e),
    }
  }

  async fn put_cell(&self, sheet: &str, cell: CellRef, value: &str) -> Result<(), SinkError> {
    let range = a1_range(sheet, Some(&cell.to_string()));
    let url = self.values_url(&range, None)?;
    let body = ValueRange {
      range: Some(range),
      values: vec![vec![Value::String(value.to_string())]],
    };
    self
      .send(Method::PUT, url, &[("valueInputOption", "RAW")], Some(&body))
      .await?;
    Ok(())
  }

  async fn post_append(&self, sheet: &str, rows: &[SinkRow]) -> Result<usize, SinkError> {
    let range = a1_range(sheet, Some("A1"));
    let url = self.values_url(&range, Some("append"))?;
    let body = ValueRange {
      range: Some(range),
      values: to_values(rows),
    };
    let response = self
      .send(
        Method::POST,
        url,
        &[
          ("valueInputOption", "USER_ENTERED"),
          ("insertDataOption", "INSERT_ROWS"),
        ],
        Some(&body),
      )
      .await?;
    let parsed: AppendResponse =
      serde_json::from_value(response).map_err(|e| SinkError::Malformed(e.to_string()))?;
    first_row_of_range(&parsed.updates.updated_range).ok_or_else(|| {
      SinkError::Malformed(format!("unexpected updated range {}", parsed.updates.updated_range))
    })
  }

  async fn post_batch(&self, sheet: &str, updates: &[CellUpdate]) -> Result<(), SinkError> {
    let url = self.url("values:batchUpdate")?;
    let body = BatchUpdateRequest {
      value_input_option: "RAW",
      data: updates
        .iter()
        .map(|u| ValueRange {
          range: Some(a1_range(sheet, Some(&u.cell.to_string()))),
          values: vec![vec![Value::String(u.value.clone())]],
        })
        .collect(),
    };
    self.send(Method::POST, url, &[], Some(&body)).await?;
    Ok(())
  }
}

/// Body of a spreadsheet `batchUpdate` adding one worksheet.
pub(crate) fn add_sheet_request(sheet: &str) -> Value {
  serde_json::json!({
    "requests": [{ "addSheet": { "properties": { "title": sheet } } }]
  })
}

/// Maps an error response onto the sink taxonomy.
pub(crate) fn classify_failure(status: u16, body: &str) -> SinkError {
  if status == 400 && body.contains("Unable to parse range") {
    return SinkError::WorksheetNotFound(body.chars().take(200).collect());
  }
  SinkError::status(status, body.chars().take(500).collect::<String>())
}

/// Quoted A1 range for `sheet`, optionally narrowed to `cells`.
pub(crate) fn a1_range(sheet: &str, cells: Option<&str>) -> String {
  let quoted = format!("'{}'", sheet.replace('\'', "''"));
  match cells {
    Some(c) => format!("{quoted}!{c}"),
    None => quoted,
  }
}

/// Row number of the top-left cell of an A1 range such as `'Vacancies'!A7:P9`.
pub(crate) fn first_row_of_range(range: &str) -> Option<usize> {
  RANGE_ROW_RE
    .captures(range)
    .and_then(|c| c[1].parse().ok())
}

fn cell_text(v: &Value) -> String {
  match v {
    Value::String(s) => s.clone(),
    Value::Null => String::new(),
    other => other.to_string(),
  }
}

fn parse_rows(body: Value) -> Result<Vec<SinkRow>, SinkError> {
  if body.is_null() {
    return Ok(Vec::new());
  }
  let vr: ValueRange = serde_json::from_value(body).map_err(|e| SinkError::Malformed(e.to_string()))?;
  Ok(
    vr.values
      .iter()
      .map(|r| r.iter().map(cell_text).collect())
      .collect(),
  )
}

fn to_values(rows: &[SinkRow]) -> Vec<Vec<Value>> {
  rows
    .iter()
    .map(|r| r.iter().map(|c| Value::String(c.clone())).collect())
    .collect()
}

#[async_trait]
impl Sink for SheetsSink {
  async fn read_cell(&self, sheet: &str, cell: CellRef) -> Result<Option<String>, SinkError> {
    let rows = self.get_values(a1_range(sheet, Some(&cell.to_string()))).await?;
    Ok(
      rows
        .into_iter()
        .next()
        .and_then(|r| r.into_iter().next())
        .filter(|v| !v.is_empty()),
    )
  }

  async fn write_cell(&self, sheet: &str, cell: CellRef, value: &str) -> Result<(), SinkError> {
    self.creating_missing(sheet, || self.put_cell(sheet, cell, value)).await
  }

  async fn append_rows(&self, sheet: &str, rows: &[SinkRow]) -> Result<usize, SinkError> {
    let first = self.creating_missing(sheet, || self.post_append(sheet, rows)).await?;
    debug!(sheet, first, rows = rows.len(), "rows appended");
    Ok(first)
  }

  async fn batch_update(&self, sheet: &str, updates: &[CellUpdate]) -> Result<(), SinkError> {
    if updates.is_empty() {
      return Ok(());
    }
    self.creating_missing(sheet, || self.post_batch(sheet, updates)).await
  }

  /// A missing worksheet reads as empty.
  async fn read_rows(&self, sheet: &str) -> Result<Vec<SinkRow>, SinkError> {
    self.get_values(a1_range(sheet, None)).await
  }

  /// Clearing a missing worksheet creates it empty.
  async fn clear(&self, sheet: &str) -> Result<(), SinkError> {
    let url = self.values_url(&a1_range(sheet, None), Some("clear"))?;
    match self
      .send(Method::POST, url, &[], Some(&serde_json::json!({})))
      .await
    {
      Ok(_) => Ok(()),
      Err(SinkError::WorksheetNotFound(_)) => self.ensure_worksheet(sheet).await,
      Err(e) => Err(e),
    }
  }

  async fn ensure_worksheet(&self, sheet: &str) -> Result<(), SinkError> {
    let url = self.spreadsheet_url("batchUpdate")?;
    match self.send(Method::POST, url, &[], Some(&add_sheet_request(sheet))).await {
      Ok(_) => {
        info!(sheet, "worksheet added");
        Ok(())
      }
      Err(SinkError::Status { status: 400, message }) if message.contains("already exists") => Ok(()),
      Err(e) => Err(e),
    }
  }
}
