//! Complete solutions to the three linked exercises. The module is
//! organized into the following sub modules:
//! * `tree` which decides whether two binary trees hold the same value
//!   sequence by walking both concurrently over channels.
//! * `crawler` which crawls a link graph behind a [Fetcher](crawler::Fetcher)
//!   with one thread per fetch, a shared visited set and a depth limit.
//! * `digest` which MD5-sums every file under a directory through a bounded
//!   walker/digester pipeline with first-error cancellation.
pub mod crawler;
pub mod digest;
pub mod tree;
