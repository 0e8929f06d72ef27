//! Sub-pipeline definitions: worksheets, slot, row schema and listing URLs.

use std::fmt;
use std::sync::Arc;

use clap::ValueEnum;

use crate::checkpoint_io::CheckpointSlot;
use crate::extract::{FieldExtractor, OccupationExtractor, VacancyExtractor};
use crate::types::{CandidateItem, FieldRecord, SinkRow, encode_hyperlink, is_url, missing_field};

pub const OCCUPATIONS_SLOT: CheckpointSlot = CheckpointSlot::new("occupations", 1, 1);
pub const VACANCIES_SLOT: CheckpointSlot = CheckpointSlot::new("vacancies", 3, 1);
pub const COMPILE_SLOT: CheckpointSlot = CheckpointSlot::new("compile", 5, 1);

const PAGE_PARAM: &str = "pageNumber";

const OCCUPATION_SEARCH: &str = "https://www.yourcareer.gov.au/occupations";
const VACANCY_SEARCH: &str = "https://www.workforceaustralia.gov.au/individuals/jobs/search";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum PipelineKind {
  Occupations,
  Vacancies,
  Compile,
}

impl PipelineKind {
  pub const ALL: [PipelineKind; 3] = [PipelineKind::Occupations, PipelineKind::Vacancies, PipelineKind::Compile];

  pub fn slot(&self) -> CheckpointSlot {
    match self {
      PipelineKind::Occupations => OCCUPATIONS_SLOT,
      PipelineKind::Vacancies => VACANCIES_SLOT,
      PipelineKind::Compile => COMPILE_SLOT,
    }
  }

  /// Extractor for the catalog this pipeline lists.
  pub fn extractor(&self) -> Arc<dyn FieldExtractor> {
    match self {
      PipelineKind::Occupations => Arc::new(OccupationExtractor),
      PipelineKind::Vacancies | PipelineKind::Compile => Arc::new(VacancyExtractor::new()),
    }
  }
}

impl fmt::Display for PipelineKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.slot().name)
  }
}

/// Where a target column's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSource {
  Key,
  DetailUrl,
  Candidate(&'static str),
  Detail(&'static str),
  /// Delimiter-set column: seeded from the candidate field of the same
  /// name on append, merged into on later encounters of the same key.
  Merge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
  pub header: &'static str,
  pub source: ColumnSource,
  /// URL values are written as hyperlink formulas.
  pub hyperlink: bool,
}

impl Column {
  pub const fn new(header: &'static str, source: ColumnSource) -> Self {
    Self {
      header,
      source,
      hyperlink: false,
    }
  }

  pub const fn link(header: &'static str, source: ColumnSource) -> Self {
    Self {
      header,
      source,
      hyperlink: true,
    }
  }
}

/// A LIST → DETAIL collection pipeline.
#[derive(Clone)]
pub struct Pipeline {
  pub kind: PipelineKind,
  pub queue_sheet: &'static str,
  pub target_sheet: &'static str,
  /// Append-only log of keys emitted per execution.
  pub ledger_sheet: &'static str,
  pub columns: Vec<Column>,
  pub extractor: Arc<dyn FieldExtractor>,
  search_url: String,
  search_params: Vec<(&'static str, &'static str)>,
}

impl Pipeline {
  pub fn new(
    kind: PipelineKind,
    extractor: Arc<dyn FieldExtractor>,
    search_url: impl Into<String>,
    columns: Vec<Column>,
  ) -> Self {
    Self {
      kind,
      queue_sheet: "Queue",
      target_sheet: "Records",
      ledger_sheet: "Ledger",
      columns,
      extractor,
      search_url: search_url.into(),
      search_params: Vec::new(),
    }
  }

  pub fn with_sheets(mut self, queue: &'static str, target: &'static str, ledger: &'static str) -> Self {
    self.queue_sheet = queue;
    self.target_sheet = target;
    self.ledger_sheet = ledger;
    self
  }

  pub fn with_params(mut self, params: Vec<(&'static str, &'static str)>) -> Self {
    self.search_params = params;
    self
  }

  pub fn occupations() -> Self {
    use crate::extract::occupation as f;
    use ColumnSource::*;
    Pipeline::new(
      PipelineKind::Occupations,
      PipelineKind::Occupations.extractor(),
      OCCUPATION_SEARCH,
      vec![
        Column::new("occupation code", Key),
        Column::new("occupation name", Candidate(f::OCCUPATION_NAME)),
        Column::link("link to occupation", DetailUrl),
        Column::new("description", Detail(f::DESCRIPTION)),
        Column::new("average salary", Detail(f::AVERAGE_SALARY)),
        Column::new("future demand", Detail(f::FUTURE_DEMAND)),
        Column::new("job type", Detail(f::JOB_TYPE)),
        Column::new("skill level", Detail(f::SKILL_LEVEL)),
        Column::new("industry", Detail(f::INDUSTRY)),
        Column::new("skills", Detail(f::SKILLS)),
        Column::new("number of vacancies", Candidate(f::NUMBER_OF_VACANCIES)),
        Column::link("link to vacancies", Candidate(f::LINK_TO_VACANCIES)),
        Column::link("link to courses", Candidate(f::LINK_TO_COURSES)),
        Column::new("apprenticeships and traineeships", Detail(f::APPRENTICESHIPS)),
        Column::new("interests", Detail(f::INTERESTS)),
        Column::new("considerations", Detail(f::CONSIDERATIONS)),
        Column::new("day-to-day", Detail(f::DAY_TO_DAY)),
      ],
    )
    .with_sheets("OccupationQueue", "Occupation", "OccupationData")
    .with_params(vec![
      ("address[locality]", ""),
      ("address[state]", "VIC"),
      ("address[postcode]", ""),
      ("address[latitude]", "0"),
      ("address[longitude]", "0"),
      ("address[formattedLocality]", "Victoria (VIC)"),
      ("distanceFilter", "25"),
    ])
  }

  pub fn vacancies() -> Self {
    use crate::extract::vacancy as f;
    use ColumnSource::*;
    Pipeline::new(
      PipelineKind::Vacancies,
      PipelineKind::Vacancies.extractor(),
      VACANCY_SEARCH,
      vec![
        Column::new("job code", Key),
        Column::new("job title", Candidate(f::JOB_TITLE)),
        Column::link("job link", DetailUrl),
        Column::new("date added", Candidate(f::DATE_ADDED)),
        Column::new("time scraped", Candidate(f::TIME_SCRAPED)),
        Column::new("overview", Candidate(f::OVERVIEW)),
        Column::new("company", Detail(f::COMPANY)),
        Column::new("salary", Detail(f::SALARY)),
        Column::new("address", Detail(f::ADDRESS)),
        Column::new("lat", Detail(f::LAT)),
        Column::new("long", Detail(f::LONG)),
        Column::new("tenure", Detail(f::TENURE)),
        Column::new("closes", Detail(f::CLOSES)),
        Column::new("description", Detail(f::DESCRIPTION)),
        Column::new("occupation", Merge),
        Column::new("occupation link", Merge),
      ],
    )
    .with_sheets("VacancyQueue", "Vacancies", "VacancyData")
    .with_params(vec![("locationCodes[0]", "7"), ("jobAge", "3")])
  }

  /// Catalog page `page` (1-based).
  pub fn listing_url(&self, page: u32) -> String {
    let mut pairs: Vec<(&str, String)> = self
      .search_params
      .iter()
      .map(|(k, v)| (*k, v.to_string()))
      .collect();
    pairs.push((PAGE_PARAM, page.to_string()));
    match serde_urlencoded::to_string(&pairs) {
      Ok(query) => format!("{}?{query}", self.search_url),
      Err(_) => format!("{}?{PAGE_PARAM}={page}", self.search_url),
    }
  }

  pub fn header(&self) -> SinkRow {
    self.columns.iter().map(|c| c.header.to_string()).collect()
  }

  /// 1-based position and header of the natural key column.
  pub fn key_column(&self) -> Option<(usize, &'static str)> {
    self
      .columns
      .iter()
      .position(|c| c.source == ColumnSource::Key)
      .map(|i| (i + 1, self.columns[i].header))
  }

  /// 1-based positions and headers of the merge columns.
  pub fn merge_columns(&self) -> impl Iterator<Item = (usize, &'static str)> + '_ {
    self
      .columns
      .iter()
      .enumerate()
      .filter(|(_, c)| c.source == ColumnSource::Merge)
      .map(|(i, c)| (i + 1, c.header))
  }

  /// The sink row for one candidate and its detail record.
  pub fn build_row(&self, item: &CandidateItem, record: &FieldRecord) -> SinkRow {
    self
      .columns
      .iter()
      .map(|c| {
        let value = match c.source {
          ColumnSource::Key => item.key.clone().unwrap_or_else(|| missing_field(c.header)),
          ColumnSource::DetailUrl => item.detail_url.clone().unwrap_or_else(|| missing_field(c.header)),
          ColumnSource::Candidate(f) => item.field(f).map(str::to_string).unwrap_or_else(|| missing_field(f)),
          ColumnSource::Detail(f) => record.value_or_placeholder(f),
          ColumnSource::Merge => item.field(c.header).unwrap_or_default().to_string(),
        };
        if c.hyperlink && is_url(&value) {
          encode_hyperlink(value.trim())
        } else {
          value
        }
      })
      .collect()
  }
}

/// `url` with its page parameter set to `page`.
pub fn with_page(url: &str, page: u32) -> String {
  let Ok(mut parsed) = reqwest::Url::parse(url) else {
    let sep = if url.contains('?') { '&' } else { '?' };
    return format!("{url}{sep}{PAGE_PARAM}={page}");
  };
  let pairs: Vec<(String, String)> = parsed
    .query_pairs()
    .filter(|(k, _)| k != PAGE_PARAM)
    .map(|(k, v)| (k.into_owned(), v.into_owned()))
    .collect();
  {
    let mut query = parsed.query_pairs_mut();
    query.clear();
    for (k, v) in &pairs {
      query.append_pair(k, v);
    }
    query.append_pair(PAGE_PARAM, &page.to_string());
  }
  parsed.to_string()
}

/// Cross-reference of occupations onto already-collected vacancies.
#[derive(Clone)]
pub struct CompileSpec {
  pub source_sheet: &'static str,
  pub source_name_column: &'static str,
  pub source_link_column: &'static str,
  pub source_listing_column: &'static str,
  pub target_sheet: &'static str,
  pub target_key_column: &'static str,
  pub merge_name_column: &'static str,
  pub merge_link_column: &'static str,
  pub extractor: Arc<dyn FieldExtractor>,
}

impl Default for CompileSpec {
  fn default() -> Self {
    Self {
      source_sheet: "Occupation",
      source_name_column: "occupation name",
      source_link_column: "link to occupation",
      source_listing_column: "link to vacancies",
      target_sheet: "Vacancies",
      target_key_column: "job code",
      merge_name_column: "occupation",
      merge_link_column: "occupation link",
      extractor: PipelineKind::Compile.extractor(),
    }
  }
}
