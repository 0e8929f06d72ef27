//! Signal handling: SIGINT/SIGTERM cancel the run between units.
//!
//! The first signal cancels the token; the driver finishes the unit in
//! flight, saves the checkpoint and flushes. A second signal exits at once.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Exit status of a forced second-signal exit.
pub const FORCED_EXIT_CODE: i32 = 130;

async fn terminate_signal() {
  #[cfg(unix)]
  {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::terminate()) {
      Ok(mut term) => {
        tokio::select! {
          _ = tokio::signal::ctrl_c() => {}
          _ = term.recv() => {}
        }
      }
      Err(e) => {
        warn!(error = %e, "SIGTERM handler unavailable, listening for Ctrl+C only");
        let _ = tokio::signal::ctrl_c().await;
      }
    }
  }
  #[cfg(not(unix))]
  {
    let _ = tokio::signal::ctrl_c().await;
  }
}

/// Spawns the listener. Cancelling `token` from elsewhere also stops it.
pub fn install(token: CancellationToken) -> JoinHandle<()> {
  tokio::spawn(async move {
    tokio::select! {
      _ = token.cancelled() => return,
      _ = terminate_signal() => {}
    }
    info!("termination requested, stopping after the current unit");
    token.cancel();
    terminate_signal().await;
    warn!("second termination signal, exiting without flush");
    std::process::exit(FORCED_EXIT_CODE);
  })
}
