//! Resumable, checkpointed catalog harvesting into an append-only
//! spreadsheet sink.
//!
//! Each execution loads its pipeline's checkpoint, advances one unit at a
//! time (a catalog page in LIST, a candidate in DETAIL), and saves the
//! checkpoint after every unit, so a killed execution loses at most the
//! unit in flight. Natural keys already present in the sink are merged
//! into, never appended twice.

pub mod backoff;
#[cfg(test)]
mod backoff_test;
pub mod browser;
pub mod checkpoint_io;
pub mod config;
#[cfg(test)]
mod config_test;
pub mod context;
pub mod dedup;
#[cfg(test)]
mod dedup_test;
pub mod error;
#[cfg(test)]
mod error_test;
pub mod extract;
pub mod phases;
pub mod pipeline;
#[cfg(test)]
mod pipeline_test;
pub mod runner;
pub mod shutdown;
pub mod sink;
/// Scripted fakes for exercising pipelines without network or sheets.
#[doc(hidden)]
pub mod testing;
pub mod types;

pub use backoff::{BackoffExecutor, RetryPolicy, SinkOutcome};
pub use checkpoint_io::{CheckpointSlot, CheckpointStore};
pub use config::{ConfigArgs, HarvestConfig, SinkKind};
pub use context::HarvestContext;
pub use error::{ConfigError, HarvestError, NavigationError, SinkError};
pub use pipeline::{CompileSpec, Pipeline, PipelineKind};
pub use runner::{DriveOptions, RunOutcome, RunReport, drive, reset, run, run_collection, run_compile, status};
pub use types::{Checkpoint, Phase};
