//! Tests for pipeline row schemas and URLs.

use crate::pipeline::{Pipeline, PipelineKind, with_page};
use crate::types::{CandidateItem, DETAIL_UNAVAILABLE, FieldRecord, decode_hyperlink};

#[test]
fn listing_url_encodes_params_and_page() {
  let url = Pipeline::vacancies().listing_url(4);
  assert_eq!(
    url,
    "https://www.workforceaustralia.gov.au/individuals/jobs/search?locationCodes%5B0%5D=7&jobAge=3&pageNumber=4"
  );
  let occ = Pipeline::occupations().listing_url(1);
  assert!(occ.contains("address%5Bstate%5D=VIC"));
  assert!(occ.ends_with("distanceFilter=25&pageNumber=1"));
}

#[test]
fn key_and_merge_columns_are_located() {
  let p = Pipeline::vacancies();
  assert_eq!(p.key_column(), Some((1, "job code")));
  let merges: Vec<_> = p.merge_columns().collect();
  assert_eq!(merges, vec![(15, "occupation"), (16, "occupation link")]);
  assert_eq!(Pipeline::occupations().merge_columns().count(), 0);
}

#[test]
fn row_uses_placeholders_and_hyperlinks() {
  let p = Pipeline::occupations();
  let item = CandidateItem::new(Some("1".into()), Some("https://o/1".into()))
    .with_field("occupation name", "Chef")
    .with_field("link to courses", "https://c/1");
  let record = FieldRecord::new().with("description", Some("Cooks".into()));
  let row = p.build_row(&item, &record);
  assert_eq!(row.len(), p.header().len());
  assert_eq!(row[0], "1");
  assert_eq!(row[1], "Chef");
  assert_eq!(row[2], "=HYPERLINK(\"https://o/1\", \"https://o/1\")");
  assert_eq!(decode_hyperlink(&row[12]), "https://c/1");
  assert_eq!(row[3], "Cooks");
  assert_eq!(row[4], "No average salary given");
  assert_eq!(row[10], "No number of vacancies given");
  assert_eq!(row[11], "No link to vacancies given");
}

#[test]
fn unavailable_detail_fills_every_detail_column() {
  let p = Pipeline::vacancies();
  let item = CandidateItem::new(Some("77".into()), None).with_field("job title", "Cook");
  let row = p.build_row(&item, &p.extractor.unavailable(DETAIL_UNAVAILABLE));
  assert_eq!(row[0], "77");
  assert_eq!(row[1], "Cook");
  assert_eq!(row[2], "No job link given");
  assert!(row[6..14].iter().all(|v| v == DETAIL_UNAVAILABLE));
  assert_eq!(row[14], "");
}

#[test]
fn with_page_replaces_existing_page_param() {
  assert_eq!(
    with_page("https://j/search?occupation=5&pageNumber=2", 3),
    "https://j/search?occupation=5&pageNumber=3"
  );
  assert_eq!(with_page("https://j/search", 1), "https://j/search?pageNumber=1");
}

#[test]
fn slots_are_distinct_cells() {
  let cells: Vec<_> = PipelineKind::ALL.iter().map(|k| k.slot().cell.to_string()).collect();
  assert_eq!(cells, vec!["A1", "A3", "A5"]);
  assert_eq!(PipelineKind::Compile.to_string(), "compile");
}
