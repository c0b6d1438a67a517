//! Instrumented concurrency pitfalls.
//!
//! ## Why write broken code on purpose?
//!
//! Each of these mistakes is invisible in a passing demo: a leaked thread
//! parks silently, a busy poll loop still produces the right answer, a
//! cloned lock still compiles and still counts, just not all the way up.
//! Every module here therefore pairs the broken shape with the correct one
//! and exposes a counter or probe that makes the difference assertable.
//!
//! * `leak` demonstrates threads stranded forever on a channel send that
//!   nobody will ever receive.
//! * `spin` demonstrates the non-blocking-poll-with-default receive loop and
//!   how many polls it burns compared to a blocking receive.
//! * `clone_lock` demonstrates duplicating a mutex instead of sharing it.
pub mod clone_lock;
pub mod leak;
pub mod spin;
