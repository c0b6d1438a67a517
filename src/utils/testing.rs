//! Deadline guards for concurrency tests.
//!
//! Every test in this crate exercises code that blocks on a channel or a
//! lock, so a broken implementation shows up as a hang rather than a failed
//! assertion. These helpers run the test body on its own thread and turn a
//! hang into a panic on the calling thread.

use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError};

pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(5);

/// Runs `f` on a fresh thread and panics if it has not finished within `d`.
///
/// The body's panic, if any, is propagated to the caller.
pub fn finish_within<T, F>(d: Duration, f: F) -> T
where
  T: Send + 'static,
  F: FnOnce() -> T + Send + 'static,
{
  let (done_tx, done_rx) = bounded(1);
  let handle = thread::Builder::new()
    .name("deadline-guard".to_owned())
    .spawn(move || {
      let value = f();
      done_tx.send(()).expect("failed to signal completion");
      value
    })
    .unwrap();
  match done_rx.recv_timeout(d) {
    Ok(()) => handle.join().expect("guarded body panicked"),
    Err(RecvTimeoutError::Timeout) => panic!("guarded body missed its deadline"),
    Err(RecvTimeoutError::Disconnected) => panic!("guarded body panicked"),
  }
}

/// [finish_within] with the default deadline.
pub fn within<T, F>(f: F) -> T
where
  T: Send + 'static,
  F: FnOnce() -> T + Send + 'static,
{
  finish_within(DEFAULT_DEADLINE, f)
}

/// Runs `f` on a fresh thread, waits up to `d` for it, then joins
/// unconditionally. Unlike [finish_within] a missed deadline is not an error;
/// this is for bodies that are allowed to outlive the interesting part of the
/// test but must still be observed to completion.
pub fn let_linger<T, F>(d: Duration, f: F) -> T
where
  T: Send + 'static,
  F: FnOnce() -> T + Send + 'static,
{
  let (done_tx, done_rx) = bounded(1);
  let handle = thread::Builder::new()
    .name("deadline-guard".to_owned())
    .spawn(move || {
      let value = f();
      let _ = done_tx.send(());
      value
    })
    .unwrap();
  let _ = done_rx.recv_timeout(d);
  handle.join().expect("guarded body panicked")
}

/// Polls `predicate` until it holds or `d` elapses, sleeping between polls.
/// Returns whether the predicate held before the deadline.
pub fn eventually<F>(d: Duration, predicate: F) -> bool
where
  F: Fn() -> bool,
{
  let deadline = std::time::Instant::now() + d;
  loop {
    if predicate() {
      return true;
    }
    if std::time::Instant::now() >= deadline {
      return false;
    }
    thread::sleep(Duration::from_millis(1));
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  #[should_panic]
  fn finish_within_deadline_test() {
    finish_within(Duration::from_millis(10), || {
      thread::sleep(Duration::from_secs(1));
    });
  }

  #[test]
  fn finish_within_passes_value_test() {
    let value = finish_within(DEFAULT_DEADLINE, || 42);
    assert_eq!(value, 42);
  }

  #[test]
  fn let_linger_tolerates_slow_body_test() {
    let_linger(Duration::from_millis(0), || {
      thread::sleep(Duration::from_millis(50));
    });
  }

  #[test]
  #[should_panic]
  fn let_linger_panic_passthrough_test() {
    let_linger(Duration::from_secs(1), || {
      panic!("test");
    });
  }

  #[test]
  fn eventually_test() {
    assert!(eventually(Duration::from_secs(1), || true));
    assert!(!eventually(Duration::from_millis(10), || false));
  }
}
