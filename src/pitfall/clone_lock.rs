//! The duplicated lock.
//!
//! A mutual-exclusion lock only excludes people who hold *the same lock*.
//! The mistake modeled here is handing each thread its own copy of a
//! lock-plus-counter instead of a handle to one shared instance: every copy
//! locks flawlessly, every increment happens, and the original never moves.
//!
//! [Shared] is the correct shape (clones share one lock through an `Arc`),
//! [Forked] is the broken one (clones duplicate the lock and the count
//! behind it). [stampede] hammers either from many threads and reports what
//! the *original* counted.

use std::sync::{Arc, Mutex};
use std::thread;

/// A clonable counter guarded by a mutual-exclusion lock.
///
/// The contract under test: after `k` calls to [bump](Tally::bump) spread
/// over any clones, [total](Tally::total) on any of them reports `k`.
/// [Shared] honors it, [Forked] does not.
pub trait Tally: Clone + Send + 'static {
  fn bump(&self);
  fn total(&self) -> u64;
}

/// One count, one lock, shared by every clone.
#[derive(Clone, Default)]
pub struct Shared {
  count: Arc<Mutex<u64>>,
}

impl Shared {
  pub fn new() -> Self {
    Self::default()
  }
}

impl Tally for Shared {
  fn bump(&self) {
    *self.count.lock().unwrap() += 1;
  }

  fn total(&self) -> u64 {
    *self.count.lock().unwrap()
  }
}

/// Looks like [Shared], but cloning it copies the count *and the lock*.
/// Each clone then excludes nobody but itself, and its increments are
/// invisible to every other clone.
#[derive(Default)]
pub struct Forked {
  count: Mutex<u64>,
}

impl Forked {
  pub fn new() -> Self {
    Self::default()
  }
}

impl Clone for Forked {
  fn clone(&self) -> Self {
    Forked {
      count: Mutex::new(*self.count.lock().unwrap()),
    }
  }
}

impl Tally for Forked {
  fn bump(&self) {
    *self.count.lock().unwrap() += 1;
  }

  fn total(&self) -> u64 {
    *self.count.lock().unwrap()
  }
}

/// Spawns `threads` threads, hands each a clone of `tally`, has each bump
/// `hits` times, joins them all and returns what the original reports.
///
/// # Example
/// ```
/// use crosstalk::pitfall::clone_lock::{stampede, Forked, Shared};
/// use crosstalk::utils::testing::within;
///
/// within(|| {
///   assert_eq!(stampede(Shared::new(), 8, 1000), 8000);
///   assert_eq!(stampede(Forked::new(), 8, 1000), 0);
/// });
/// ```
pub fn stampede<T>(tally: T, threads: usize, hits: u64) -> u64
where
  T: Tally,
{
  let handles: Vec<_> = (0..threads)
    .map(|i| {
      let local = tally.clone();
      thread::Builder::new()
        .name(format!("stampede{}", i))
        .spawn(move || {
          for _ in 0..hits {
            local.bump();
          }
        })
        .unwrap()
    })
    .collect();
  for handle in handles {
    handle.join().expect("stampede thread panicked");
  }
  let total = tally.total();
  if total != threads as u64 * hits {
    log::warn!(
      "stampede lost updates: saw {} of {} bumps",
      total,
      threads as u64 * hits
    );
  }
  total
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::utils::testing::within;

  #[test]
  fn shared_counts_every_bump_test() {
    within(|| {
      assert_eq!(stampede(Shared::new(), 8, 500), 4000);
    });
  }

  #[test]
  fn forked_counts_nothing_test() {
    within(|| {
      assert_eq!(stampede(Forked::new(), 8, 500), 0);
    });
  }

  #[test]
  fn forked_clones_diverge_test() {
    let original = Forked::new();
    original.bump();
    let copy = original.clone();
    copy.bump();
    assert_eq!(original.total(), 1);
    assert_eq!(copy.total(), 2);
  }

  #[test]
  fn shared_clones_agree_test() {
    let original = Shared::new();
    original.bump();
    let copy = original.clone();
    copy.bump();
    assert_eq!(original.total(), 2);
    assert_eq!(copy.total(), 2);
  }

  #[test]
  fn stampede_with_no_threads_test() {
    within(|| {
      assert_eq!(stampede(Shared::new(), 0, 100), 0);
    });
  }
}
