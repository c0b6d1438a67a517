//! A concurrent, deduplicating, depth-limited crawler.
//!
//! Fetching is abstracted behind [Fetcher] so the crawl logic can be tested
//! against an in-memory link graph. The concurrency shape is the classic
//! coordinator loop: one thread per fetch in flight, a mutual-exclusion lock
//! around the visited set so each URL is claimed exactly once, and a single
//! channel funneling every outcome back to the coordinator, which tracks how
//! many fetches remain and stops when the count hits zero.

use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam_channel::{unbounded, Sender};

/// A fetched document: its body and the URLs it links to.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
  pub body: String,
  pub links: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
  NotFound(String),
}

impl Display for FetchError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      FetchError::NotFound(url) => write!(f, "not found: {}", url),
    }
  }
}

impl Error for FetchError {}

/// Something that can resolve a URL to a document.
pub trait Fetcher: Send + Sync + 'static {
  fn fetch(&self, url: &str) -> Result<Fetched, FetchError>;
}

/// One successfully crawled page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
  pub url: String,
  pub body: String,
  /// Remaining depth at which this page was reached; the start page carries
  /// the full budget.
  pub depth: usize,
}

struct Outcome {
  url: String,
  depth: usize,
  fetched: Result<Fetched, FetchError>,
}

/// Reports a fetch outcome from its drop, so the coordinator's pending
/// count stays honest even when a [Fetcher] implementation panics. `None`
/// means the fetch produced nothing to act on.
struct Reporter {
  tx: Sender<Option<Outcome>>,
  outcome: Option<Outcome>,
}

impl Drop for Reporter {
  fn drop(&mut self) {
    if self.outcome.is_none() && std::thread::panicking() {
      log::warn!("fetch thread panicked before reporting");
    }
    let _ = self.tx.send(self.outcome.take());
  }
}

/// Crawls outward from `url`, following links until `depth` runs out.
///
/// Each URL is fetched at most once no matter how many pages link to it.
/// Fetch failures are logged and skipped; they do not stop the crawl.
/// Pages are returned in the order their fetches completed, which varies
/// run to run.
///
/// # Example
/// ```
/// use crosstalk::exercise::crawler::{crawl, MapFetcher};
/// use crosstalk::utils::testing::within;
/// use std::sync::Arc;
///
/// within(|| {
///   let pages = crawl("https://example.org/", 4, Arc::new(MapFetcher::sample()));
///   assert_eq!(pages.len(), 4);
/// });
/// ```
pub fn crawl(url: &str, depth: usize, fetcher: Arc<dyn Fetcher>) -> Vec<Page> {
  if depth == 0 {
    return Vec::new();
  }
  let (outcome_tx, outcome_rx) = unbounded();
  let visited = Arc::new(Mutex::new(HashSet::new()));
  static FETCH_SEQ: AtomicUsize = AtomicUsize::new(0);

  let spawn_fetch = |url: String, depth: usize| {
    let fetcher = fetcher.clone();
    let visited = visited.clone();
    let outcome_tx = outcome_tx.clone();
    let id = FETCH_SEQ.fetch_add(1, Ordering::Relaxed);
    thread::Builder::new()
      .name(format!("fetcher{}", id))
      .spawn(move || {
        let mut reporter = Reporter {
          tx: outcome_tx,
          outcome: None,
        };
        // Claim the URL under the lock; whoever claims it fetches it.
        if !visited.lock().unwrap().insert(url.clone()) {
          log::debug!("skipping {}, already claimed", url);
          return;
        }
        let fetched = fetcher.fetch(&url);
        reporter.outcome = Some(Outcome { url, depth, fetched });
      })
      .unwrap()
  };

  let mut pending = 1usize;
  spawn_fetch(url.to_owned(), depth);
  let mut pages = Vec::new();
  while pending > 0 {
    // Every spawned fetch reports exactly once, panics included: the
    // reporter sends from its drop, mid-unwind if need be. So this cannot
    // block indefinitely.
    let outcome = outcome_rx.recv().unwrap();
    pending -= 1;
    let outcome = match outcome {
      Some(outcome) => outcome,
      None => continue,
    };
    match outcome.fetched {
      Ok(fetched) => {
        if outcome.depth > 1 {
          for link in &fetched.links {
            pending += 1;
            spawn_fetch(link.clone(), outcome.depth - 1);
          }
        }
        pages.push(Page {
          url: outcome.url,
          body: fetched.body,
          depth: outcome.depth,
        });
      }
      Err(error) => log::warn!("fetch of {} failed: {}", outcome.url, error),
    }
  }
  pages
}

/// An in-memory [Fetcher] over a fixed set of pages; everything else is
/// [FetchError::NotFound].
#[derive(Default)]
pub struct MapFetcher {
  pages: Vec<(String, Fetched)>,
}

impl MapFetcher {
  pub fn new() -> Self {
    Self::default()
  }

  /// Adds a page and the links it contains. Returns `self` for chaining.
  pub fn page(mut self, url: &str, body: &str, links: &[&str]) -> Self {
    self.pages.push((
      url.to_owned(),
      Fetched {
        body: body.to_owned(),
        links: links.iter().map(|link| (*link).to_owned()).collect(),
      },
    ));
    self
  }

  /// A small site with a cycle and a dangling link, enough to exercise
  /// deduplication, depth limiting and error skipping.
  pub fn sample() -> Self {
    Self::new()
      .page(
        "https://example.org/",
        "index",
        &["https://example.org/a/", "https://example.org/b/"],
      )
      .page(
        "https://example.org/a/",
        "package a",
        &["https://example.org/", "https://example.org/a/deep/"],
      )
      .page(
        "https://example.org/b/",
        "package b",
        &["https://example.org/", "https://example.org/missing/"],
      )
      .page("https://example.org/a/deep/", "package a, internals", &[])
  }
}

impl Fetcher for MapFetcher {
  fn fetch(&self, url: &str) -> Result<Fetched, FetchError> {
    self
      .pages
      .iter()
      .find(|(known, _)| known == url)
      .map(|(_, fetched)| fetched.clone())
      .ok_or_else(|| FetchError::NotFound(url.to_owned()))
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::utils::testing::within;

  fn urls(pages: &[Page]) -> Vec<String> {
    let mut urls: Vec<String> = pages.iter().map(|page| page.url.clone()).collect();
    urls.sort();
    urls
  }

  #[test]
  fn crawl_visits_whole_sample_test() {
    within(|| {
      let pages = crawl("https://example.org/", 4, Arc::new(MapFetcher::sample()));
      assert_eq!(
        urls(&pages),
        vec![
          "https://example.org/",
          "https://example.org/a/",
          "https://example.org/a/deep/",
          "https://example.org/b/",
        ]
      );
    });
  }

  #[test]
  fn crawl_deduplicates_test() {
    within(|| {
      // "/" is linked from both "a" and "b" but fetched once.
      let pages = crawl("https://example.org/", 4, Arc::new(MapFetcher::sample()));
      let root_count = pages.iter().filter(|p| p.url == "https://example.org/").count();
      assert_eq!(root_count, 1);
    });
  }

  #[test]
  fn crawl_respects_depth_test() {
    within(|| {
      let fetcher = Arc::new(MapFetcher::sample());
      assert!(crawl("https://example.org/", 0, fetcher.clone()).is_empty());
      assert_eq!(
        urls(&crawl("https://example.org/", 1, fetcher.clone())),
        vec!["https://example.org/"]
      );
      assert_eq!(
        urls(&crawl("https://example.org/", 2, fetcher)),
        vec![
          "https://example.org/",
          "https://example.org/a/",
          "https://example.org/b/",
        ]
      );
    });
  }

  #[test]
  fn crawl_skips_fetch_errors_test() {
    within(|| {
      // Depth 3 reaches the dangling "missing" link; the crawl still
      // terminates and still reports everything that resolved.
      let pages = crawl("https://example.org/", 3, Arc::new(MapFetcher::sample()));
      assert_eq!(pages.len(), 4);
    });
  }

  #[test]
  fn crawl_from_missing_root_test() {
    within(|| {
      let pages = crawl("https://example.org/nope/", 3, Arc::new(MapFetcher::sample()));
      assert!(pages.is_empty());
    });
  }

  #[test]
  fn crawl_survives_panicking_fetcher_test() {
    // A fetcher that blows up on one page must cost the crawl that page
    // only, not hang the coordinator's pending count.
    struct Grenade {
      inner: MapFetcher,
    }

    impl Fetcher for Grenade {
      fn fetch(&self, url: &str) -> Result<Fetched, FetchError> {
        if url == "https://example.org/b/" {
          panic!("fetcher blew up on {}", url);
        }
        self.inner.fetch(url)
      }
    }

    within(|| {
      let fetcher = Arc::new(Grenade {
        inner: MapFetcher::sample(),
      });
      let pages = crawl("https://example.org/", 2, fetcher);
      assert_eq!(
        urls(&pages),
        vec!["https://example.org/", "https://example.org/a/"]
      );
    });
  }

  #[test]
  fn map_fetcher_not_found_test() {
    let fetcher = MapFetcher::sample();
    assert_eq!(
      fetcher.fetch("https://example.org/nope/"),
      Err(FetchError::NotFound("https://example.org/nope/".to_owned()))
    );
    assert_eq!(
      fetcher.fetch("https://example.org/nope/").unwrap_err().to_string(),
      "not found: https://example.org/nope/"
    );
  }
}
