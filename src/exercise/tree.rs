//! Equivalent binary trees.
//!
//! Two binary search trees can store the same sequence in wildly different
//! shapes. Comparing them structurally is wrong; comparing them by their
//! in-order walk is exactly right, and streaming each walk over a channel
//! lets the two walks run in lockstep without materializing either one.
//!
//! The subtlety worth teaching: when [same] finds a mismatch it simply drops
//! both receivers. The walker threads notice the disconnect at their next
//! send and exit. Without that, every early return would strand two threads
//! mid-walk, which is the leak demonstrated in
//! [pitfall::leak](crate::pitfall::leak).

use std::thread;

use crossbeam_channel::{bounded, Receiver, SendError, Sender};
use rand::seq::SliceRandom;

/// A binary search tree of integers.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
  pub value: i32,
  pub left: Option<Box<Tree>>,
  pub right: Option<Box<Tree>>,
}

impl Tree {
  pub fn leaf(value: i32) -> Self {
    Tree {
      value,
      left: None,
      right: None,
    }
  }

  /// Inserts `value`, keeping the search-tree ordering. Duplicates go left.
  pub fn insert(&mut self, value: i32) {
    let side = if value <= self.value {
      &mut self.left
    } else {
      &mut self.right
    };
    match side {
      Some(child) => child.insert(value),
      None => *side = Some(Box::new(Tree::leaf(value))),
    }
  }

  /// Builds a randomly shaped tree holding `k, 2k, ..., 10k`.
  ///
  /// Two calls with the same `k` hold the same sequence but almost never
  /// the same shape, which is the whole point of the exercise.
  ///
  /// # Example
  /// ```
  /// use crosstalk::exercise::tree::{same, Tree};
  /// use crosstalk::utils::testing::within;
  ///
  /// within(|| {
  ///   assert!(same(Tree::shuffled(1), Tree::shuffled(1)));
  ///   assert!(!same(Tree::shuffled(1), Tree::shuffled(2)));
  /// });
  /// ```
  pub fn shuffled(k: i32) -> Self {
    let mut order: Vec<i32> = (1..=10).map(|i| i * k).collect();
    order.shuffle(&mut rand::thread_rng());
    let mut iter = order.into_iter();
    // The range above is never empty.
    let mut tree = Tree::leaf(iter.next().unwrap());
    for value in iter {
      tree.insert(value);
    }
    tree
  }

  /// Sends the tree's values to `tx` in sorted order. Stops early with the
  /// unsent value if the receiving side has gone away.
  pub fn walk(&self, tx: &Sender<i32>) -> Result<(), SendError<i32>> {
    if let Some(left) = &self.left {
      left.walk(tx)?;
    }
    tx.send(self.value)?;
    if let Some(right) = &self.right {
      right.walk(tx)?;
    }
    Ok(())
  }

  /// Spawns a walker thread and returns the receiving end of its walk.
  ///
  /// The channel is a rendezvous, so the walker advances only as fast as
  /// the consumer reads and holds no buffered values when dropped.
  pub fn stream(self) -> Receiver<i32> {
    let (tx, rx) = bounded(0);
    thread::Builder::new()
      .name("tree-walker".to_owned())
      .spawn(move || {
        if self.walk(&tx).is_err() {
          log::debug!("tree walk abandoned, consumer went away");
        }
      })
      .unwrap();
    rx
  }

  /// The in-order sequence, collected. Mostly useful in assertions.
  pub fn in_order(&self) -> Vec<i32> {
    fn visit(tree: &Tree, out: &mut Vec<i32>) {
      if let Some(left) = &tree.left {
        visit(left, out);
      }
      out.push(tree.value);
      if let Some(right) = &tree.right {
        visit(right, out);
      }
    }
    let mut out = Vec::new();
    visit(self, &mut out);
    out
  }
}

/// Whether `a` and `b` hold the same value sequence, decided by walking both
/// concurrently and comparing element by element.
///
/// Returns as soon as the sequences diverge; the abandoned walker threads
/// unwind on their next send.
pub fn same(a: Tree, b: Tree) -> bool {
  let walk_a = a.stream();
  let walk_b = b.stream();
  loop {
    match (walk_a.recv(), walk_b.recv()) {
      (Ok(x), Ok(y)) => {
        if x != y {
          return false;
        }
      }
      (Err(_), Err(_)) => return true,
      // One walk ended before the other.
      _ => return false,
    }
  }
}
