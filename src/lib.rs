//! Group several test results and report them as one.
//!
//! A [`group`] runs a body that records results through [`ok`], [`skip`] and
//! [`diag`]. Instead of going to the harness one by one, those results are
//! collected and turned into a single pass, fail or TODO result named after
//! the group.
//!
//! ```
//! use kigroup::{group, ok, todo};
//!
//! group("parser", || {
//!     ok("1 + 1".contains('+'), "finds operator");
//!     todo::scope("unicode operators", || {
//!         ok("1 − 1".contains('-'), "finds minus sign");
//!     });
//! });
//! kigroup::harness::done_testing();
//! ```

pub mod config;
pub mod control;
pub mod exception;
pub mod harness;
pub mod plugin;
pub mod subtest;
pub mod todo;

mod error;
pub use error::*;

mod dispatch;
pub use dispatch::{diag, is_intercepting, ok, skip};

mod group;
pub use group::*;

#[cfg(test)]
mod test_support;
