//! Bounded-parallel MD5 digesting of a file tree.
//!
//! The pipeline has three stages: a walker thread that feeds file paths into
//! a bounded channel, a fixed crew of digester threads that read and hash,
//! and the calling thread collecting results. The path channel's bound is
//! what keeps the walker from racing ahead of the digesters on a huge tree;
//! the crew size is what keeps the process from opening every file at once.
//!
//! Errors ride the results channel as the `Err` arm of its payload, and a
//! separate `done` channel (never sent on, only dropped) tells every stage
//! to stop early once the first error has been seen.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};
use md5::{Digest, Md5};

/// How far the walker may run ahead of the digesters.
const WALK_AHEAD: usize = 64;

/// An MD5 digest, displayed as 32 lowercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Md5Sum(pub [u8; 16]);

impl Display for Md5Sum {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    for byte in &self.0 {
      write!(f, "{:02x}", byte)?;
    }
    Ok(())
  }
}

#[derive(Debug)]
pub enum DigestError {
  Io(PathBuf, io::Error),
}

impl Display for DigestError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      DigestError::Io(path, error) => write!(f, "{}: {}", path.display(), error),
    }
  }
}

impl Error for DigestError {
  fn source(&self) -> Option<&(dyn Error + 'static)> {
    match self {
      DigestError::Io(_, error) => Some(error),
    }
  }
}

type DigestOutcome = Result<(PathBuf, Md5Sum), DigestError>;

/// Digests every file under `root` with one digester per logical CPU.
///
/// `root` may also name a single file. The result maps each path to its
/// digest, sorted by path. The first I/O error cancels all outstanding work
/// and is returned.
pub fn digest_dir(root: &Path) -> Result<BTreeMap<PathBuf, Md5Sum>, DigestError> {
  digest_dir_with(root, num_cpus::get())
}

/// [digest_dir] with an explicit digester crew size.
///
/// # Panics
///
/// Panics if `workers` is zero.
///
/// # Example
/// ```
/// use crosstalk::exercise::digest::digest_dir_with;
/// use crosstalk::utils::testing::within;
///
/// within(|| {
///   let dir = tempfile::tempdir().unwrap();
///   std::fs::write(dir.path().join("greeting"), b"hello").unwrap();
///   let sums = digest_dir_with(dir.path(), 2).unwrap();
///   assert_eq!(
///     sums[&dir.path().join("greeting")].to_string(),
///     "5d41402abc4b2a76b9719d911017c592",
///   );
/// });
/// ```
pub fn digest_dir_with(root: &Path, workers: usize) -> Result<BTreeMap<PathBuf, Md5Sum>, DigestError> {
  assert!(workers > 0, "the digester crew cannot be empty");
  let (path_tx, path_rx) = bounded(WALK_AHEAD);
  let (outcome_tx, outcome_rx) = unbounded::<DigestOutcome>();
  let (done_tx, done_rx) = bounded::<()>(0);

  let walker = spawn_walker(root.to_owned(), path_tx, done_rx.clone());
  let digesters: Vec<_> = (0..workers)
    .map(|i| spawn_digester(i, path_rx.clone(), outcome_tx.clone(), done_rx.clone()))
    .collect();
  // The stages hold the only remaining senders; dropping ours lets the
  // outcome channel disconnect once they finish.
  drop(outcome_tx);
  drop(path_rx);

  let mut done_tx = Some(done_tx);
  let mut sums = BTreeMap::new();
  let mut first_error = None;
  for outcome in outcome_rx.iter() {
    match outcome {
      Ok((path, sum)) => {
        sums.insert(path, sum);
      }
      Err(error) => {
        if first_error.is_none() {
          log::warn!("digest pipeline cancelled: {}", error);
          first_error = Some(error);
          // Dropping the only sender trips the done channel everywhere.
          done_tx.take();
        }
      }
    }
  }

  let walked = walker.join().expect("walker thread panicked");
  for digester in digesters {
    digester.join().expect("digester thread panicked");
  }
  if let Some(error) = first_error {
    return Err(error);
  }
  walked?;
  Ok(sums)
}

fn spawn_walker(
  root: PathBuf,
  path_tx: Sender<PathBuf>,
  done_rx: Receiver<()>,
) -> JoinHandle<Result<(), DigestError>> {
  thread::Builder::new()
    .name("digest-walker".to_owned())
    .spawn(move || walk(&root, &path_tx, &done_rx).map(|_| ()))
    .unwrap()
}

/// Recursively offers every file under `dir` to the path channel. Returns
/// `Ok(false)` when told to stop early, either by the done channel or by the
/// digesters having gone away.
fn walk(dir: &Path, path_tx: &Sender<PathBuf>, done_rx: &Receiver<()>) -> Result<bool, DigestError> {
  let meta = fs::metadata(dir).map_err(|e| DigestError::Io(dir.to_owned(), e))?;
  if meta.is_file() {
    return Ok(offer(dir.to_owned(), path_tx, done_rx));
  }
  let entries = fs::read_dir(dir).map_err(|e| DigestError::Io(dir.to_owned(), e))?;
  for entry in entries {
    let entry = entry.map_err(|e| DigestError::Io(dir.to_owned(), e))?;
    let path = entry.path();
    let file_type = entry.file_type().map_err(|e| DigestError::Io(path.clone(), e))?;
    let keep_going = if file_type.is_dir() {
      walk(&path, path_tx, done_rx)?
    } else if file_type.is_file() {
      offer(path, path_tx, done_rx)
    } else {
      // Sockets, fifos and friends are not hashable files.
      true
    };
    if !keep_going {
      return Ok(false);
    }
  }
  Ok(true)
}

fn offer(path: PathBuf, path_tx: &Sender<PathBuf>, done_rx: &Receiver<()>) -> bool {
  select! {
    send(path_tx, path) -> sent => sent.is_ok(),
    recv(done_rx) -> _ => false,
  }
}

fn spawn_digester(
  id: usize,
  path_rx: Receiver<PathBuf>,
  outcome_tx: Sender<DigestOutcome>,
  done_rx: Receiver<()>,
) -> JoinHandle<()> {
  thread::Builder::new()
    .name(format!("digester{}", id))
    .spawn(move || loop {
      select! {
        recv(done_rx) -> _ => return,
        recv(path_rx) -> msg => {
          let path = match msg {
            Ok(path) => path,
            Err(_) => return,
          };
          let outcome = fs::read(&path)
            .map(|data| {
              let sum = Md5::digest(&data);
              (path.clone(), Md5Sum(sum.into()))
            })
            .map_err(|e| DigestError::Io(path, e));
          if outcome_tx.send(outcome).is_err() {
            return;
          }
        }
      }
    })
    .unwrap()
}
