//! Tests for `BackoffExecutor`.

use std::cell::Cell;
use std::time::Duration;

use proptest::prelude::*;
use tokio::time::Instant;

use crate::backoff::{BackoffExecutor, RetryPolicy, SinkOutcome};
use crate::error::SinkError;

fn executor(attempts: u32, delay_secs: u64) -> BackoffExecutor {
  BackoffExecutor::new(RetryPolicy {
    max_attempts: attempts,
    initial_delay: Duration::from_secs(delay_secs),
  })
}

#[test]
fn delays_double() {
  let p = RetryPolicy::default();
  assert_eq!(p.delay_after(1), Duration::from_secs(5));
  assert_eq!(p.delay_after(2), Duration::from_secs(10));
  assert_eq!(p.delay_after(3), Duration::from_secs(20));
  assert_eq!(p.max_total_delay(), Duration::from_secs(35));
}

#[tokio::test(start_paused = true)]
async fn succeeds_on_third_attempt_after_two_503s() {
  let calls = Cell::new(0u32);
  let start = Instant::now();
  let out = executor(3, 5)
    .execute("append", || {
      calls.set(calls.get() + 1);
      let n = calls.get();
      async move {
        if n < 3 {
          Err(SinkError::status(503, "unavailable"))
        } else {
          Ok(n)
        }
      }
    })
    .await
    .unwrap();
  assert_eq!(out.done(), Some(3));
  assert_eq!(calls.get(), 3);
  assert_eq!(start.elapsed(), Duration::from_secs(15));
}

#[tokio::test(start_paused = true)]
async fn exhaustion_is_dropped_not_an_error() {
  let calls = Cell::new(0u32);
  let out: SinkOutcome<()> = executor(3, 1)
    .execute("write", || {
      calls.set(calls.get() + 1);
      async { Err(SinkError::status(429, "quota")) }
    })
    .await
    .unwrap();
  assert!(out.is_dropped());
  assert_eq!(calls.get(), 3);
}

#[tokio::test(start_paused = true)]
async fn fatal_error_propagates_without_retry() {
  let calls = Cell::new(0u32);
  let start = Instant::now();
  let err = executor(3, 5)
    .execute("read", || {
      calls.set(calls.get() + 1);
      async { Err::<(), _>(SinkError::status(403, "forbidden")) }
    })
    .await
    .unwrap_err();
  assert!(matches!(err, SinkError::Status { status: 403, .. }));
  assert_eq!(calls.get(), 1);
  assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn timeout_kind_is_retried() {
  let calls = Cell::new(0u32);
  let out = executor(2, 1)
    .execute("read", || {
      calls.set(calls.get() + 1);
      let n = calls.get();
      async move {
        if n == 1 {
          Err(SinkError::Timeout("read timed out".into()))
        } else {
          Ok("v")
        }
      }
    })
    .await
    .unwrap();
  assert_eq!(out.done(), Some("v"));
}

proptest! {
  #![proptest_config(ProptestConfig::with_cases(32))]

  #[test]
  fn attempts_and_total_delay_are_bounded(attempts in 1u32..6, delay in 1u64..4) {
    let rt = tokio::runtime::Builder::new_current_thread()
      .enable_time()
      .start_paused(true)
      .build()
      .unwrap();
    rt.block_on(async {
      let calls = Cell::new(0u32);
      let start = Instant::now();
      let exec = executor(attempts, delay);
      let out: SinkOutcome<()> = exec
        .execute("prop", || {
          calls.set(calls.get() + 1);
          async { Err(SinkError::status(500, "boom")) }
        })
        .await
        .unwrap();
      prop_assert!(out.is_dropped());
      prop_assert_eq!(calls.get(), attempts);
      prop_assert!(start.elapsed() <= exec.policy().max_total_delay());
      Ok(())
    })?;
  }
}
