//! Tests for occupation field extraction.

use crate::browser::ItemHandle;
use crate::extract::{FieldExtractor, OccupationExtractor, skills_tab_url};
use crate::types::missing_field;

const ITEM: &str = r#"<section class="mint-search-result-item no-description">
  <a class="link mint-link link" href="/occupations/261313/software-engineer?tab=overview"> Software   Engineer </a>
  <a target="_blank" href="https://jobs.example/x">124 jobs</a>
  <a rel="nofollow" href="https://www.workforceaustralia.gov.au/individuals/jobs/search?occupation=261313">See jobs</a>
  <a aria-label="Explore courses for Software Engineer" href="/courses?occ=261313">Courses</a>
</section>"#;

const DETAIL: &str = r##"<html><body>
  <div class="text-lg">Designs and builds software.</div>
  <ul>
    <li><h3 identifer="Occupation_Insights_Average_Salary">Average salary</h3><p>$2,000 per week</p></li>
    <li><div><h3 identifer="Occupation_Insights_Future_Demand">Future demand</h3></div>
      <span class="mint-pill__content-label">Strong</span></li>
    <li><h3 identifer="Occupation_Insights_Job_Type">Job type</h3><p>Full time</p></li>
  </ul>
  <ul class="industry-link-list"><li><a class="mint-link" href="#">IT</a></li><li><a class="mint-link" href="#">Finance</a></li></ul>
  <h3 identifier="Interests_Stories_Heading">Interests</h3>
  <ul><li><span class="mint-pill__content-label">Coding</span></li><li><span class="mint-pill__content-label">Logic</span></li></ul>
  <h3 identifier="Day_to_day_Stories_Heading">Day to day</h3>
  <ul><li>Write code</li><li>Review code</li></ul>
</body></html>"##;

const SKILLS: &str = r#"<html><body>
  <p identifier="Skills_Top_Skills_Requested">Top skills</p>
  <ul><li><span class="mint-pill__content-label">Rust</span></li><li><span class="mint-pill__content-label">SQL</span></li></ul>
</body></html>"#;

#[test]
fn candidate_captures_code_links_and_counts() {
  let c = OccupationExtractor.candidate(&ItemHandle::new(ITEM, "https://www.yourcareer.gov.au/occupations"));
  assert_eq!(c.key.as_deref(), Some("261313"));
  assert_eq!(
    c.detail_url.as_deref(),
    Some("https://www.yourcareer.gov.au/occupations/261313/software-engineer?tab=overview")
  );
  assert_eq!(c.field("occupation name"), Some("Software Engineer"));
  assert_eq!(c.field("number of vacancies"), Some("124"));
  assert!(c.field("link to vacancies").unwrap().contains("occupation=261313"));
  assert_eq!(c.field("link to courses"), Some("https://www.yourcareer.gov.au/courses?occ=261313"));
}

#[test]
fn candidate_without_detail_link_has_no_key_or_url() {
  let c = OccupationExtractor.candidate(&ItemHandle::new("<section><p>x</p></section>", "u"));
  assert!(c.key.is_none());
  assert!(c.detail_url.is_none());
  assert!(c.fields.is_empty());
}

#[test]
fn skills_tab_replaces_overview_tab() {
  assert_eq!(skills_tab_url("https://h/o/1/x?tab=overview"), "https://h/o/1/x?tab=skills");
  assert_eq!(skills_tab_url("https://h/o/1/x?a=b&tab=overview"), "https://h/o/1/x?a=b&tab=skills");
  assert_eq!(skills_tab_url("https://h/o/1/x"), "https://h/o/1/x?tab=skills");
}

#[test]
fn detail_reads_main_and_skills_pages() {
  let pages = vec![
    Some(ItemHandle::new(DETAIL, "main")),
    Some(ItemHandle::new(SKILLS, "skills")),
  ];
  let r = OccupationExtractor.detail(&pages);
  assert_eq!(r.get("description"), Some("Designs and builds software."));
  assert_eq!(r.get("average salary"), Some("$2,000 per week"));
  assert_eq!(r.get("future demand"), Some("Strong"));
  assert_eq!(r.get("job type"), Some("Full time"));
  assert_eq!(r.get("industry"), Some("IT, \nFinance"));
  assert_eq!(r.get("interests"), Some("Coding, \nLogic"));
  assert_eq!(r.get("day-to-day"), Some("'Write code',\n'Review code'"));
  assert_eq!(r.get("skills"), Some("Rust, SQL"));
  assert_eq!(r.value_or_placeholder("skill level"), missing_field("skill level"));
  assert!(r.missing().any(|f| f == "considerations"));
}

#[test]
fn failed_skills_page_is_reported_in_field() {
  let pages = vec![Some(ItemHandle::new(DETAIL, "main")), None];
  let r = OccupationExtractor.detail(&pages);
  assert_eq!(r.get("skills"), Some("Failed to load skills page"));
}
