//! Run driver: loads the checkpoint, steps the phase machine unit by unit
//! and saves after every unit until finished, cancelled or out of budget.

use std::fmt;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, instrument, warn};
use uuid::Uuid;

use crate::checkpoint_io::CheckpointStore;
use crate::context::HarvestContext;
use crate::error::HarvestError;
use crate::phases::{CollectionMachine, CompileMachine, PhaseMachine};
use crate::pipeline::{CompileSpec, Pipeline, PipelineKind};
use crate::types::Checkpoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
  /// The terminal checkpoint was reached in this execution.
  Finished,
  /// The slot was already terminal; nothing ran.
  AlreadyFinished,
  /// The unit budget ran out; the next execution resumes.
  Suspended,
  /// A termination signal arrived; stopped between units.
  Cancelled,
}

impl fmt::Display for RunOutcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      RunOutcome::Finished => "finished",
      RunOutcome::AlreadyFinished => "already finished",
      RunOutcome::Suspended => "suspended",
      RunOutcome::Cancelled => "cancelled",
    };
    f.write_str(s)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
  pub run_id: Uuid,
  pub pipeline: String,
  pub outcome: RunOutcome,
  /// Units completed in this execution.
  pub units: usize,
  /// Last checkpoint known to the driver.
  pub checkpoint: Checkpoint,
}

/// Per-execution limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveOptions {
  pub max_units: Option<usize>,
  /// Pause between units; cut short by cancellation.
  pub unit_pause: Duration,
}

impl Default for DriveOptions {
  fn default() -> Self {
    Self {
      max_units: None,
      unit_pause: Duration::from_millis(1000),
    }
  }
}

/// Flushes after a fatal error without masking it.
async fn abort(machine: &mut dyn PhaseMachine, error: HarvestError) -> HarvestError {
  warn!(error = %error, "run failed, flushing before exit");
  if let Err(e) = machine.flush().await {
    warn!(error = %e, "flush after failure failed");
  }
  error
}

/// Drives `machine` from the checkpoint in `store`.
///
/// Checkpoints are saved strictly after the unit they describe. The token
/// is only observed between units.
pub async fn drive(
  machine: &mut dyn PhaseMachine,
  store: &CheckpointStore,
  cancel: &CancellationToken,
  options: &DriveOptions,
) -> Result<RunReport, HarvestError> {
  let run_id = Uuid::new_v4();
  let span = info_span!("run", %run_id, pipeline = machine.name());
  drive_inner(run_id, machine, store, cancel, options).instrument(span).await
}

async fn drive_inner(
  run_id: Uuid,
  machine: &mut dyn PhaseMachine,
  store: &CheckpointStore,
  cancel: &CancellationToken,
  options: &DriveOptions,
) -> Result<RunReport, HarvestError> {
  let pipeline = machine.name().to_string();
  let report = |outcome, units, checkpoint| RunReport {
    run_id,
    pipeline: pipeline.clone(),
    outcome,
    units,
    checkpoint,
  };

  let mut cp = store.load().await?;
  if cp.is_finished() {
    info!("checkpoint already finished, nothing to do");
    return Ok(report(RunOutcome::AlreadyFinished, 0, cp));
  }

  let mut units = 0;
  let outcome = loop {
    if cancel.is_cancelled() {
      break RunOutcome::Cancelled;
    }
    if options.max_units.is_some_and(|max| units >= max) {
      break RunOutcome::Suspended;
    }

    let next = match machine.step(&cp).await {
      Ok(next) => next,
      Err(e) => return Err(abort(machine, e).await),
    };
    if !cp.phase.can_advance_to(next.phase) {
      warn!(from = %cp.phase, to = %next.phase, "backward phase transition");
    }
    if let Err(e) = store.save(&next).await {
      return Err(abort(machine, e).await);
    }
    if next.phase != cp.phase {
      info!(from = %cp.phase, to = %next.phase, "phase transition");
    }
    cp = next;
    units += 1;
    if cp.is_finished() {
      break RunOutcome::Finished;
    }

    if !options.unit_pause.is_zero() {
      tokio::select! {
        _ = cancel.cancelled() => {}
        _ = tokio::time::sleep(options.unit_pause) => {}
      }
    }
  };

  if outcome == RunOutcome::Cancelled {
    match store.save(&cp).await {
      Ok(true) => {}
      Ok(false) => warn!("checkpoint save on cancellation dropped"),
      Err(e) => warn!(error = %e, "checkpoint save on cancellation failed"),
    }
  }
  machine.flush().await?;
  info!(%outcome, units, phase = %cp.phase, cursor = cp.cursor, index = cp.index, "run ended");
  Ok(report(outcome, units, cp))
}

/// Runs one collection pipeline.
#[instrument(level = "trace", skip_all, fields(pipeline = %pipeline.kind))]
pub async fn run_collection(
  ctx: &HarvestContext,
  pipeline: Pipeline,
  cancel: &CancellationToken,
  options: &DriveOptions,
) -> Result<RunReport, HarvestError> {
  let store = ctx.checkpoint_store(pipeline.kind.slot());
  let mut machine = CollectionMachine::new(ctx.clone(), pipeline);
  drive(&mut machine, &store, cancel, options).await
}

/// Runs the cross-reference compile.
pub async fn run_compile(
  ctx: &HarvestContext,
  spec: CompileSpec,
  cancel: &CancellationToken,
  options: &DriveOptions,
) -> Result<RunReport, HarvestError> {
  let store = ctx.checkpoint_store(PipelineKind::Compile.slot());
  let mut machine = CompileMachine::new(ctx.clone(), spec);
  drive(&mut machine, &store, cancel, options).await
}

/// Runs the built-in pipeline `kind`.
pub async fn run(
  ctx: &HarvestContext,
  kind: PipelineKind,
  cancel: &CancellationToken,
  options: &DriveOptions,
) -> Result<RunReport, HarvestError> {
  match kind {
    PipelineKind::Occupations => run_collection(ctx, Pipeline::occupations(), cancel, options).await,
    PipelineKind::Vacancies => run_collection(ctx, Pipeline::vacancies(), cancel, options).await,
    PipelineKind::Compile => run_compile(ctx, CompileSpec::default(), cancel, options).await,
  }
}

/// Re-initializes the checkpoint slots of `kinds`.
pub async fn reset(ctx: &HarvestContext, kinds: &[PipelineKind]) -> Result<(), HarvestError> {
  for kind in kinds {
    if !ctx.checkpoint_store(kind.slot()).reset().await? {
      warn!(pipeline = %kind, "checkpoint reset dropped");
    }
  }
  Ok(())
}

/// Current checkpoint of every slot.
pub async fn status(ctx: &HarvestContext) -> Result<Vec<(PipelineKind, Checkpoint)>, HarvestError> {
  let mut out = Vec::with_capacity(PipelineKind::ALL.len());
  for kind in PipelineKind::ALL {
    out.push((kind, ctx.checkpoint_store(kind.slot()).load().await?));
  }
  Ok(out)
}
