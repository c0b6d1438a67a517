//! Crosstalk is:
//! * a set of complete, tested solutions to three classic concurrency
//!   exercises: equivalent binary trees, a concurrent web crawler and
//!   bounded-parallel MD5 digesting of a file tree.
//! * a set of instrumented concurrency pitfalls (leaked threads, busy-spun
//!   polling loops and cloned locks) built so the failure can be measured by
//!   a test instead of taken on faith.
#[macro_use]
extern crate lazy_static;

pub mod exercise;
pub mod pitfall;
pub mod utils;
