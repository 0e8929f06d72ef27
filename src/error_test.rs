//! Tests for error classification.

use crate::error::{NavigationError, SinkError};

#[test]
fn retryable_statuses() {
  for s in [429, 500, 502, 503, 504] {
    assert!(SinkError::status(s, "x").is_retryable(), "{s} should retry");
  }
}

#[test]
fn fatal_statuses() {
  for s in [400, 401, 403, 404, 501] {
    assert!(!SinkError::status(s, "x").is_retryable(), "{s} should be fatal");
  }
}

#[test]
fn timeout_is_retryable_other_kinds_are_not() {
  assert!(SinkError::Timeout("read".into()).is_retryable());
  assert!(!SinkError::Transport("dns".into()).is_retryable());
  assert!(!SinkError::WorksheetNotFound("Progress".into()).is_retryable());
  assert!(!SinkError::Malformed("{".into()).is_retryable());
}

#[test]
fn messages_carry_context() {
  let e = SinkError::status(503, "backend unavailable");
  assert_eq!(e.to_string(), "sink responded 503: backend unavailable");
  let n = NavigationError::Status {
    url: "https://x".into(),
    status: 502,
  };
  assert_eq!(n.to_string(), "https://x responded 502");
}
