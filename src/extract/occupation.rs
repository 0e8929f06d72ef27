//! Occupation catalog fields.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;
use tracing::debug;

use super::{FieldExtractor, absolute, all, document, first, first_attr, first_text, fragment, joined_texts, text_of};
use crate::browser::ItemHandle;
use crate::types::{CandidateItem, FieldRecord};

pub const OCCUPATION_BASE_URL: &str = "https://www.yourcareer.gov.au";

pub const OCCUPATION_NAME: &str = "occupation name";
pub const NUMBER_OF_VACANCIES: &str = "number of vacancies";
pub const LINK_TO_VACANCIES: &str = "link to vacancies";
pub const LINK_TO_COURSES: &str = "link to courses";

pub const DESCRIPTION: &str = "description";
pub const AVERAGE_SALARY: &str = "average salary";
pub const FUTURE_DEMAND: &str = "future demand";
pub const JOB_TYPE: &str = "job type";
pub const SKILL_LEVEL: &str = "skill level";
pub const INDUSTRY: &str = "industry";
pub const SKILLS: &str = "skills";
pub const APPRENTICESHIPS: &str = "apprenticeships and traineeships";
pub const INTERESTS: &str = "interests";
pub const CONSIDERATIONS: &str = "considerations";
pub const DAY_TO_DAY: &str = "day-to-day";

const SKILLS_PAGE_FAILED: &str = "Failed to load skills page";
const PILL: &str = "span.mint-pill__content-label";

static CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/occupations/(\d+)/").expect("valid regex"));
static LEADING_DIGITS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+").expect("valid regex"));
static OVERVIEW_TAB_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([?&])tab=overview").expect("valid regex"));

/// Overview-tab URL to skills-tab URL.
pub fn skills_tab_url(url: &str) -> String {
  if OVERVIEW_TAB_RE.is_match(url) {
    return OVERVIEW_TAB_RE.replace(url, "${1}tab=skills").into_owned();
  }
  let sep = if url.contains('?') { '&' } else { '?' };
  format!("{url}{sep}tab=skills")
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OccupationExtractor;

impl OccupationExtractor {
  fn insight(root: ElementRef<'_>, id: &str) -> Option<String> {
    first_text(root, &format!("h3[identifer='{id}'] ~ p"))
  }

  /// Pill label of the list item holding the future demand heading.
  fn future_demand(root: ElementRef<'_>) -> Option<String> {
    all(root, "li")
      .into_iter()
      .filter(|li| first(*li, "h3[identifer='Occupation_Insights_Future_Demand']").is_some())
      .last()
      .and_then(|li| first_text(li, PILL))
  }

  fn stories(root: ElementRef<'_>, heading: &str) -> Option<String> {
    joined_texts(root, &format!("h3[identifier='{heading}'] ~ ul {PILL}"), ", \n")
  }

  fn day_to_day(root: ElementRef<'_>) -> Option<String> {
    let items: Vec<String> = all(root, "h3[identifier='Day_to_day_Stories_Heading'] ~ ul li")
      .into_iter()
      .map(text_of)
      .filter(|t| !t.is_empty())
      .map(|t| format!("'{t}'"))
      .collect();
    (!items.is_empty()).then(|| items.join(",\n"))
  }
}

impl FieldExtractor for OccupationExtractor {
  fn item_selector(&self) -> &'static str {
    "section.mint-search-result-item.no-description"
  }

  fn queue_fields(&self) -> &'static [&'static str] {
    &[OCCUPATION_NAME, NUMBER_OF_VACANCIES, LINK_TO_VACANCIES, LINK_TO_COURSES]
  }

  fn detail_fields(&self) -> &'static [&'static str] {
    &[
      DESCRIPTION,
      AVERAGE_SALARY,
      FUTURE_DEMAND,
      JOB_TYPE,
      SKILL_LEVEL,
      INDUSTRY,
      SKILLS,
      APPRENTICESHIPS,
      INTERESTS,
      CONSIDERATIONS,
      DAY_TO_DAY,
    ]
  }

  fn candidate(&self, item: &ItemHandle) -> CandidateItem {
    let html = fragment(item);
    let root = html.root_element();
    let detail = first(root, "a.link.mint-link");
    let detail_url = detail
      .and_then(|a| a.value().attr("href"))
      .map(|href| absolute(OCCUPATION_BASE_URL, href.trim()));
    let code = detail_url
      .as_deref()
      .and_then(|u| CODE_RE.captures(u))
      .map(|c| c[1].to_string());
    let mut candidate = CandidateItem::new(code, detail_url);
    if let Some(name) = detail.map(text_of).filter(|n| !n.is_empty()) {
      candidate = candidate.with_field(OCCUPATION_NAME, name);
    }
    let vacancies = first_text(root, "a[target='_blank']")
      .and_then(|t| LEADING_DIGITS_RE.find(&t).map(|m| m.as_str().to_string()));
    if let Some(n) = vacancies {
      candidate = candidate.with_field(NUMBER_OF_VACANCIES, n);
    }
    if let Some(href) = first_attr(root, "a[rel='nofollow']", "href") {
      candidate = candidate.with_field(LINK_TO_VACANCIES, absolute(OCCUPATION_BASE_URL, &href));
    }
    if let Some(href) = first_attr(root, "a[aria-label^='Explore courses'], a[aria-label^='View course']", "href") {
      candidate = candidate.with_field(LINK_TO_COURSES, absolute(OCCUPATION_BASE_URL, &href));
    }
    debug!(key = ?candidate.key, "occupation candidate");
    candidate
  }

  fn detail_pages(&self, detail_url: &str) -> Vec<String> {
    vec![detail_url.to_string(), skills_tab_url(detail_url)]
  }

  fn detail(&self, pages: &[Option<ItemHandle>]) -> FieldRecord {
    let mut record = FieldRecord::new();
    if let Some(Some(main)) = pages.first() {
      let html = document(main);
      let root = html.root_element();
      record.set(DESCRIPTION, first_text(root, "div.text-lg"));
      record.set(AVERAGE_SALARY, Self::insight(root, "Occupation_Insights_Average_Salary"));
      record.set(FUTURE_DEMAND, Self::future_demand(root));
      record.set(JOB_TYPE, Self::insight(root, "Occupation_Insights_Job_Type"));
      record.set(SKILL_LEVEL, Self::insight(root, "Occupation_Insights_Skill_Level"));
      record.set(INDUSTRY, joined_texts(root, "ul.industry-link-list a.mint-link", ", \n"));
      record.set(APPRENTICESHIPS, joined_texts(root, &format!("ul.list-inline {PILL}"), ", \n"));
      record.set(INTERESTS, Self::stories(root, "Interests_Stories_Heading"));
      record.set(CONSIDERATIONS, Self::stories(root, "Considerations_Stories_Heading"));
      record.set(DAY_TO_DAY, Self::day_to_day(root));
    }
    let skills = match pages.get(1) {
      Some(Some(page)) => {
        let html = document(page);
        joined_texts(
          html.root_element(),
          &format!("p[identifier='Skills_Top_Skills_Requested'] ~ ul {PILL}"),
          ", ",
        )
      }
      Some(None) => Some(SKILLS_PAGE_FAILED.to_string()),
      None => None,
    };
    record.set(SKILLS, skills);
    record
  }
}
