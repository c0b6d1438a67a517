//! The poll-with-default busy loop.
//!
//! A multi-way wait with a `default` arm never blocks: if no channel is
//! ready it takes the default and comes straight back around. Wrapped in a
//! loop, that is a CPU core spent asking "anything yet?" as fast as it can.
//! The blocking form of the same receive asks exactly once.
//!
//! [poll_recv] and [poll_either] are the busy shapes, instrumented to count
//! how many polls they burn; [blocking_recv] and [recv_either] are their
//! blocking counterparts, which by construction report a single poll.

use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvError, TryRecvError};
use rand::distributions::{Distribution, Uniform};

lazy_static! {
  /// Spread added to every delayed send, so poll counts are large and
  /// nondeterministic the way real arrival times are.
  static ref JITTER_MILLIS: Uniform<u64> = Uniform::from(0..8);
}

/// A received value together with the number of polls it cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Polled<T> {
  pub value: T,
  pub polls: u64,
}

/// Receives by polling in a tight loop, the select-with-default busy wait.
///
/// Returns how many polls ran before a value was ready. Compare with
/// [blocking_recv], which always reports one.
pub fn poll_recv<T>(rx: &Receiver<T>) -> Result<Polled<T>, RecvError> {
  let mut polls = 0u64;
  loop {
    polls += 1;
    match rx.try_recv() {
      Ok(value) => {
        log::debug!("burned {} polls on one receive", polls);
        return Ok(Polled { value, polls });
      }
      Err(TryRecvError::Empty) => std::hint::spin_loop(),
      Err(TryRecvError::Disconnected) => return Err(RecvError),
    }
  }
}

/// Receives by blocking. Reports exactly one poll, for symmetry with
/// [poll_recv].
pub fn blocking_recv<T>(rx: &Receiver<T>) -> Result<Polled<T>, RecvError> {
  rx.recv().map(|value| Polled { value, polls: 1 })
}

/// Waits on two channels at once by spinning a select with a default arm.
pub fn poll_either<T>(a: &Receiver<T>, b: &Receiver<T>) -> Result<Polled<T>, RecvError> {
  let mut polls = 0u64;
  loop {
    polls += 1;
    crossbeam_channel::select! {
      recv(a) -> msg => return msg.map(|value| Polled { value, polls }).map_err(|_| RecvError),
      recv(b) -> msg => return msg.map(|value| Polled { value, polls }).map_err(|_| RecvError),
      default => std::hint::spin_loop(),
    }
  }
}

/// Waits on two channels at once, blocking until one is ready.
pub fn recv_either<T>(a: &Receiver<T>, b: &Receiver<T>) -> Result<Polled<T>, RecvError> {
  crossbeam_channel::select! {
    recv(a) -> msg => msg.map(|value| Polled { value, polls: 1 }).map_err(|_| RecvError),
    recv(b) -> msg => msg.map(|value| Polled { value, polls: 1 }).map_err(|_| RecvError),
  }
}

/// Sends `value` from a background thread after `delay` plus a few
/// milliseconds of jitter, and hands back the receiving end.
///
/// # Example
/// ```
/// use crosstalk::pitfall::spin::{delayed_send, poll_recv};
/// use crosstalk::utils::testing::within;
/// use std::time::Duration;
///
/// within(|| {
///   let rx = delayed_send(7, Duration::from_millis(5));
///   let polled = poll_recv(&rx).unwrap();
///   assert_eq!(polled.value, 7);
/// });
/// ```
pub fn delayed_send<T>(value: T, delay: Duration) -> Receiver<T>
where
  T: Send + 'static,
{
  let (tx, rx) = bounded(1);
  thread::Builder::new()
    .name("delayed-sender".to_owned())
    .spawn(move || {
      let jitter = JITTER_MILLIS.sample(&mut rand::thread_rng());
      thread::sleep(delay + Duration::from_millis(jitter));
      let _ = tx.send(value);
    })
    .unwrap();
  rx
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::utils::testing::within;

  #[test]
  fn poll_recv_counts_polls_test() {
    within(|| {
      let rx = delayed_send(1, Duration::from_millis(10));
      let polled = poll_recv(&rx).unwrap();
      assert_eq!(polled.value, 1);
      assert!(polled.polls >= 1);
    });
  }

  #[test]
  fn poll_recv_spins_while_waiting_test() {
    within(|| {
      let rx = delayed_send("late", Duration::from_millis(50));
      let polled = poll_recv(&rx).unwrap();
      // 50ms of try_recv in a tight loop runs far more than once.
      assert!(polled.polls > 100);
    });
  }

  #[test]
  fn blocking_recv_polls_once_test() {
    within(|| {
      let rx = delayed_send(2, Duration::from_millis(50));
      let polled = blocking_recv(&rx).unwrap();
      assert_eq!(polled, Polled { value: 2, polls: 1 });
    });
  }

  #[test]
  fn poll_recv_disconnected_test() {
    within(|| {
      let (tx, rx) = bounded::<i32>(1);
      drop(tx);
      assert_eq!(poll_recv(&rx), Err(RecvError));
    });
  }

  #[test]
  fn poll_either_takes_first_ready_test() {
    within(|| {
      let fast = delayed_send(1, Duration::from_millis(0));
      let slow = delayed_send(2, Duration::from_secs(60));
      let polled = poll_either(&fast, &slow).unwrap();
      assert_eq!(polled.value, 1);
    });
  }

  #[test]
  fn recv_either_blocks_until_ready_test() {
    within(|| {
      let fast = delayed_send(1, Duration::from_millis(20));
      let slow = delayed_send(2, Duration::from_secs(60));
      let polled = recv_either(&fast, &slow).unwrap();
      assert_eq!(polled, Polled { value: 1, polls: 1 });
    });
  }
}
