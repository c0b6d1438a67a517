//! The stranded-sender leak.
//!
//! The classic shape: fan a request out to `n` replicas, take whichever
//! response arrives first and move on. Over a rendezvous channel the `n - 1`
//! losers stay parked inside their send forever: the receiver still exists,
//! it just never receives again. Nothing crashes and nothing is reported;
//! the threads are simply gone from the budget.
//!
//! [leaky_first_response] reproduces that shape and [first_response] fixes
//! it with a buffer deep enough for every replica to deposit its response
//! and exit. Both return a [LeakProbe] so the caller can count how many
//! replicas are still parked mid-send.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver};

lazy_static! {
  /// Names of every replica thread currently parked inside a send, across
  /// all races in the process. Purely observational.
  static ref PARKED_REPLICAS: Mutex<BTreeSet<String>> = Mutex::new(BTreeSet::new());
}

/// Names of all replica threads currently parked mid-send, process-wide.
pub fn parked_replicas() -> Vec<String> {
  PARKED_REPLICAS.lock().unwrap().iter().cloned().collect()
}

/// Observes the replica threads left behind by a race.
///
/// The probe holds the race's receiver alive. For the leaky variant that is
/// exactly what keeps the losers parked: their channel is still connected,
/// so their sends never resolve. Dropping the probe (or calling
/// [release](LeakProbe::release)) disconnects the channel, which is the one
/// thing that lets a parked sender return.
pub struct LeakProbe<T> {
  receiver: Receiver<T>,
  parked: Arc<AtomicUsize>,
}

impl<T> LeakProbe<T> {
  /// Number of replicas from this race currently parked inside their send.
  pub fn parked(&self) -> usize {
    self.parked.load(Ordering::SeqCst)
  }

  /// Disconnects the channel and waits for every parked replica to return.
  pub fn release(self) {
    let LeakProbe { receiver, parked } = self;
    drop(receiver);
    while parked.load(Ordering::SeqCst) != 0 {
      thread::sleep(Duration::from_millis(1));
    }
  }
}

fn race<T, F>(n: usize, buffer: usize, work: F) -> (T, LeakProbe<T>)
where
  T: Send + 'static,
  F: Fn(usize) -> T + Send + Sync + 'static,
{
  assert!(n > 0, "a race needs at least one replica");
  static RACE_SEQ: AtomicUsize = AtomicUsize::new(0);
  let seq = RACE_SEQ.fetch_add(1, Ordering::Relaxed);
  let (tx, rx) = bounded(buffer);
  let parked = Arc::new(AtomicUsize::new(0));
  let work = Arc::new(work);
  for i in 0..n {
    let tx = tx.clone();
    let parked = parked.clone();
    let work = work.clone();
    let name = format!("race{}-replica{}", seq, i);
    thread::Builder::new()
      .name(name.clone())
      .spawn(move || {
        let response = work(i);
        parked.fetch_add(1, Ordering::SeqCst);
        PARKED_REPLICAS.lock().unwrap().insert(name.clone());
        if tx.send(response).is_err() {
          log::debug!("{} released, its response went unread", name);
        }
        PARKED_REPLICAS.lock().unwrap().remove(&name);
        parked.fetch_sub(1, Ordering::SeqCst);
      })
      .unwrap();
  }
  drop(tx);
  // At least one replica holds a sender, so the first receive cannot fail.
  let winner = rx.recv().unwrap();
  (winner, LeakProbe { receiver: rx, parked })
}

/// Fans `work` out to `n` replicas over a rendezvous channel and takes the
/// first response. The other `n - 1` replicas stay parked inside their send
/// for as long as the returned probe lives.
///
/// # Panics
///
/// Panics if `n` is zero.
///
/// # Example
/// ```
/// use crosstalk::pitfall::leak::leaky_first_response;
/// use crosstalk::utils::testing::{eventually, within, DEFAULT_DEADLINE};
///
/// within(|| {
///   let (winner, probe) = leaky_first_response(4, |i| i * 10);
///   assert_eq!(winner % 10, 0);
///   assert!(eventually(DEFAULT_DEADLINE, || probe.parked() == 3));
///   probe.release();
/// });
/// ```
pub fn leaky_first_response<T, F>(n: usize, work: F) -> (T, LeakProbe<T>)
where
  T: Send + 'static,
  F: Fn(usize) -> T + Send + Sync + 'static,
{
  race(n, 0, work)
}

/// The repaired race: the channel holds `n` responses, so every replica
/// deposits its response immediately and exits. The probe drains to zero on
/// its own.
///
/// # Panics
///
/// Panics if `n` is zero.
pub fn first_response<T, F>(n: usize, work: F) -> (T, LeakProbe<T>)
where
  T: Send + 'static,
  F: Fn(usize) -> T + Send + Sync + 'static,
{
  race(n, n, work)
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::utils::testing::{eventually, within, DEFAULT_DEADLINE};

  #[test]
  fn leaky_race_strands_losers_test() {
    within(|| {
      let (winner, probe) = leaky_first_response(4, |i| i);
      assert!(winner < 4);
      assert!(eventually(DEFAULT_DEADLINE, || probe.parked() == 3));
      assert_eq!(probe.parked(), 3);
      probe.release();
    });
  }

  #[test]
  fn released_probe_frees_losers_test() {
    within(|| {
      let (_, probe) = leaky_first_response(3, |i| i);
      assert!(eventually(DEFAULT_DEADLINE, || probe.parked() == 2));
      // The registry sees this race's stragglers too, possibly alongside
      // replicas from races run by other tests.
      assert!(parked_replicas().len() >= 2);
      // Blocks until all three replicas have returned.
      probe.release();
    });
  }

  #[test]
  fn buffered_race_strands_nobody_test() {
    within(|| {
      let (winner, probe) = first_response(4, |i| i);
      assert!(winner < 4);
      assert!(eventually(DEFAULT_DEADLINE, || probe.parked() == 0));
      probe.release();
    });
  }

  #[test]
  fn single_replica_race_test() {
    within(|| {
      let (winner, probe) = leaky_first_response(1, |_| "only");
      assert_eq!(winner, "only");
      assert!(eventually(DEFAULT_DEADLINE, || probe.parked() == 0));
      probe.release();
    });
  }

  #[test]
  #[should_panic]
  fn empty_race_test() {
    let _ = first_response(0, |i| i);
  }
}
