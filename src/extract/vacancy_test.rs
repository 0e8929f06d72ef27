//! Tests for vacancy field extraction.

use chrono::{DateTime, Local, TimeZone};

use crate::browser::ItemHandle;
use crate::extract::{FieldExtractor, VacancyExtractor};

fn fixed_clock() -> DateTime<Local> {
  Local.with_ymd_and_hms(2024, 3, 10, 14, 30, 0).unwrap()
}

const ITEM: &str = r#"<section class="mint-search-result-item has-img has-actions has-preheading">
  <div class="preheading">Added 3 days ago</div>
  <a class="mint-link link" href="/individuals/jobs/details/58231994">Barista</a>
  <div class="mint-blurb">Make great coffee.</div>
</section>"#;

const DETAIL: &str = r#"<html><body>
  <p><b>Company:</b> Bean Co</p>
  <div class="address-text">1 Main St, Melbourne VIC</div>
  <ul class="job-info-metadata">
    <li><span>Posted</span><span>today</span></li>
    <li><span>Salary</span><span>$30 per hour</span></li>
    <li><span>Tenure</span><span>Casual</span></li>
    <li><span>Closes</span><span>1 April 2024</span></li>
  </ul>
  <div class="card-copy"><h2>About</h2><p>ignored</p></div>
  <div class="card-copy"><h2>Job description</h2><p>Pour coffee.</p><p>Smile.</p></div>
  <a class="custom mint-button secondary direction-btn" href="https://maps.example/@-37.8136,144.9631,15z">Directions</a>
</body></html>"#;

#[test]
fn candidate_resolves_link_code_and_dates() {
  let c = VacancyExtractor::with_clock(fixed_clock).candidate(&ItemHandle::new(ITEM, "u"));
  assert_eq!(c.key.as_deref(), Some("58231994"));
  assert_eq!(
    c.detail_url.as_deref(),
    Some("https://www.workforceaustralia.gov.au/individuals/jobs/details/58231994")
  );
  assert_eq!(c.field("job title"), Some("Barista"));
  assert_eq!(c.field("date added"), Some("March 07, 2024"));
  assert_eq!(c.field("time scraped"), Some("March 10, 2024 02:30 PM"));
  assert_eq!(c.field("overview"), Some("Make great coffee."));
}

#[test]
fn preheading_without_number_means_one_day() {
  let item = r#"<section><div class="preheading">Added yesterday</div></section>"#;
  let c = VacancyExtractor::with_clock(fixed_clock).candidate(&ItemHandle::new(item, "u"));
  assert_eq!(c.field("date added"), Some("March 09, 2024"));
  assert!(c.key.is_none());
}

#[test]
fn detail_reads_metadata_description_and_coordinates() {
  let r = VacancyExtractor::new().detail(&[Some(ItemHandle::new(DETAIL, "d"))]);
  assert_eq!(r.get("company"), Some("Bean Co"));
  assert_eq!(r.get("address"), Some("1 Main St, Melbourne VIC"));
  assert_eq!(r.get("salary"), Some("$30 per hour"));
  assert_eq!(r.get("tenure"), Some("Casual"));
  assert_eq!(r.get("closes"), Some("1 April 2024"));
  assert_eq!(r.get("description"), Some("Pour coffee.\nSmile."));
  assert_eq!(r.get("lat"), Some("-37.8136"));
  assert_eq!(r.get("long"), Some("144.9631"));
}

#[test]
fn company_falls_back_to_find_a_job_link() {
  let html = r##"<div id="find-a-job"><div class="text-lg"><p><a href="#">Acme</a></p></div></div>"##;
  let r = VacancyExtractor::new().detail(&[Some(ItemHandle::new(html, "d"))]);
  assert_eq!(r.get("company"), Some("Acme"));
  assert_eq!(r.value_or_placeholder("salary"), "No salary given");
}

#[test]
fn unavailable_marks_every_detail_field() {
  let r = VacancyExtractor::new().unavailable("Failed to load detail page");
  for f in VacancyExtractor::new().detail_fields() {
    assert_eq!(r.get(f), Some("Failed to load detail page"));
  }
}
