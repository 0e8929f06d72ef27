//! Tests for configuration resolution.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{ConfigArgs, HarvestConfig, SinkKind};
use crate::error::ConfigError;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
  let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
  move |name| map.get(name).cloned()
}

#[test]
fn sheets_backend_requires_credentials() {
  let err = HarvestConfig::resolve(&ConfigArgs::default(), env(&[])).unwrap_err();
  assert!(matches!(err, ConfigError::Missing("HARVEST_SPREADSHEET_ID")));
  let err = HarvestConfig::resolve(&ConfigArgs::default(), env(&[("HARVEST_SPREADSHEET_ID", "abc")])).unwrap_err();
  assert!(matches!(err, ConfigError::Missing("HARVEST_SHEETS_TOKEN")));
}

#[test]
fn csv_backend_requires_data_dir() {
  let args = ConfigArgs {
    sink: Some(SinkKind::Csv),
    ..ConfigArgs::default()
  };
  let err = HarvestConfig::resolve(&args, env(&[])).unwrap_err();
  assert!(matches!(err, ConfigError::Missing("HARVEST_DATA_DIR")));
}

#[test]
fn defaults_apply_for_memory_backend() {
  let cfg = HarvestConfig::resolve(&ConfigArgs::default(), env(&[("HARVEST_SINK", "memory")])).unwrap();
  assert_eq!(cfg.sink, SinkKind::Memory);
  assert_eq!(cfg.progress_sheet, "Progress");
  assert_eq!(cfg.retry.max_attempts, 3);
  assert_eq!(cfg.retry.initial_delay, Duration::from_secs(5));
  assert_eq!(cfg.max_units, None);
  assert_eq!(cfg.unit_pause, Duration::from_millis(1000));
}

#[test]
fn environment_overrides_flags() {
  let args = ConfigArgs {
    sink: Some(SinkKind::Memory),
    data_dir: Some(PathBuf::from("/flag")),
    max_units: Some(5),
    unit_pause_ms: Some(10),
    ..ConfigArgs::default()
  };
  let cfg = HarvestConfig::resolve(
    &args,
    env(&[
      ("HARVEST_SINK", "csv"),
      ("HARVEST_DATA_DIR", "/env"),
      ("HARVEST_MAX_UNITS", "7"),
      ("HARVEST_RETRY_ATTEMPTS", "4"),
      ("HARVEST_RETRY_DELAY_SECS", "1"),
    ]),
  )
  .unwrap();
  assert_eq!(cfg.sink, SinkKind::Csv);
  assert_eq!(cfg.data_dir, Some(PathBuf::from("/env")));
  assert_eq!(cfg.max_units, Some(7));
  assert_eq!(cfg.unit_pause, Duration::from_millis(10));
  assert_eq!(cfg.retry.max_attempts, 4);
  assert_eq!(cfg.drive_options().max_units, Some(7));
}

#[test]
fn malformed_numbers_are_rejected() {
  let err = HarvestConfig::resolve(
    &ConfigArgs::default(),
    env(&[("HARVEST_SINK", "memory"), ("HARVEST_MAX_UNITS", "lots")]),
  )
  .unwrap_err();
  assert!(matches!(err, ConfigError::Invalid { name: "HARVEST_MAX_UNITS", .. }));
  let err = HarvestConfig::resolve(&ConfigArgs::default(), env(&[("HARVEST_SINK", "ftp")])).unwrap_err();
  assert!(matches!(err, ConfigError::Invalid { name: "HARVEST_SINK", .. }));
}

#[test]
fn csv_sink_is_built_in_data_dir() {
  let dir = tempfile::tempdir().unwrap();
  let args = ConfigArgs {
    sink: Some(SinkKind::Csv),
    data_dir: Some(dir.path().join("sheets")),
    ..ConfigArgs::default()
  };
  let cfg = HarvestConfig::resolve(&args, env(&[])).unwrap();
  assert!(cfg.build_sink().is_ok());
  assert!(dir.path().join("sheets").is_dir());
}
