//! Vacancy search fields.

use chrono::{DateTime, Duration, Local};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;

use super::{FieldExtractor, absolute, all, document, first, first_attr, first_text, fragment, text_of};
use crate::browser::ItemHandle;
use crate::types::{CandidateItem, FieldRecord};

pub const VACANCY_BASE_URL: &str = "https://www.workforceaustralia.gov.au";

pub const JOB_TITLE: &str = "job title";
pub const DATE_ADDED: &str = "date added";
pub const TIME_SCRAPED: &str = "time scraped";
pub const OVERVIEW: &str = "overview";

pub const COMPANY: &str = "company";
pub const SALARY: &str = "salary";
pub const ADDRESS: &str = "address";
pub const LAT: &str = "lat";
pub const LONG: &str = "long";
pub const TENURE: &str = "tenure";
pub const CLOSES: &str = "closes";
pub const DESCRIPTION: &str = "description";

static DIGITS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));
static COORDS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"@(-?\d+\.\d+),(-?\d+\.\d+)").expect("valid regex"));

/// Extracts vacancies. Relative dates are resolved against `clock`.
#[derive(Clone, Copy)]
pub struct VacancyExtractor {
  clock: fn() -> DateTime<Local>,
}

impl Default for VacancyExtractor {
  fn default() -> Self {
    Self { clock: Local::now }
  }
}

impl VacancyExtractor {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_clock(clock: fn() -> DateTime<Local>) -> Self {
    Self { clock }
  }

  /// "Added 3 days ago" to a calendar date; no number means one day.
  fn date_added(&self, preheading: &str) -> String {
    let days = DIGITS_RE
      .find(preheading)
      .and_then(|m| m.as_str().parse::<i64>().ok())
      .unwrap_or(1);
    ((self.clock)() - Duration::days(days)).format("%B %d, %Y").to_string()
  }

  fn company(root: ElementRef<'_>) -> Option<String> {
    let labelled = all(root, "p")
      .into_iter()
      .find(|p| all(*p, "b").into_iter().any(|b| text_of(b).contains("Company:")))
      .map(|p| text_of(p).replace("Company:", "").trim().to_string())
      .filter(|c| !c.is_empty());
    labelled.or_else(|| first_text(root, "#find-a-job div.text-lg p a"))
  }

  fn metadata(root: ElementRef<'_>, nth: usize) -> Option<String> {
    first_text(
      root,
      &format!("ul.job-info-metadata > li:nth-child({nth}) > span:nth-of-type(2)"),
    )
  }

  fn description(root: ElementRef<'_>) -> Option<String> {
    let card = all(root, "div.card-copy")
      .into_iter()
      .find(|card| first(*card, "h2").is_some_and(|h| text_of(h).contains("Job description")))?;
    let paragraphs: Vec<String> = all(card, "p").into_iter().map(text_of).collect();
    let text = paragraphs.join("\n");
    (!text.trim().is_empty()).then_some(text)
  }
}

impl FieldExtractor for VacancyExtractor {
  fn item_selector(&self) -> &'static str {
    "section.mint-search-result-item.has-img.has-actions.has-preheading"
  }

  fn queue_fields(&self) -> &'static [&'static str] {
    &[JOB_TITLE, DATE_ADDED, TIME_SCRAPED, OVERVIEW]
  }

  fn detail_fields(&self) -> &'static [&'static str] {
    &[COMPANY, SALARY, ADDRESS, LAT, LONG, TENURE, CLOSES, DESCRIPTION]
  }

  fn candidate(&self, item: &ItemHandle) -> CandidateItem {
    let html = fragment(item);
    let root = html.root_element();
    let link = first(root, "a.mint-link.link");
    let href = link.and_then(|a| a.value().attr("href")).map(str::trim);
    let code = href
      .and_then(|h| h.split('?').next())
      .and_then(|h| h.trim_end_matches('/').rsplit('/').next())
      .map(str::to_string);
    let job_link = href.map(|h| absolute(VACANCY_BASE_URL, h));
    let mut candidate = CandidateItem::new(code, job_link);
    if let Some(title) = link.map(text_of).filter(|t| !t.is_empty()) {
      candidate = candidate.with_field(JOB_TITLE, title);
    }
    if let Some(pre) = first_text(root, "div.preheading") {
      candidate = candidate.with_field(DATE_ADDED, self.date_added(&pre));
    }
    candidate = candidate.with_field(
      TIME_SCRAPED,
      (self.clock)().format("%B %d, %Y %I:%M %p").to_string(),
    );
    if let Some(overview) = first_text(root, "div.mint-blurb") {
      candidate = candidate.with_field(OVERVIEW, overview);
    }
    candidate
  }

  fn detail(&self, pages: &[Option<ItemHandle>]) -> FieldRecord {
    let mut record = FieldRecord::new();
    let Some(Some(main)) = pages.first() else {
      return record;
    };
    let html = document(main);
    let root = html.root_element();
    record.set(COMPANY, Self::company(root));
    record.set(ADDRESS, first_text(root, "div.address-text"));
    record.set(SALARY, Self::metadata(root, 2));
    record.set(TENURE, Self::metadata(root, 3));
    record.set(CLOSES, Self::metadata(root, 4));
    record.set(DESCRIPTION, Self::description(root));
    let coords = first_attr(root, "a.direction-btn", "href").and_then(|href| {
      COORDS_RE
        .captures(&href)
        .map(|c| (c[1].to_string(), c[2].to_string()))
    });
    record.set(LAT, coords.as_ref().map(|c| c.0.clone()));
    record.set(LONG, coords.map(|c| c.1));
    record
  }
}
