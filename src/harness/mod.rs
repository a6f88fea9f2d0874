//! The reporting harness that groups sit on top of.
//!
//! A harness is the thing that actually records results: it numbers them,
//! prints them and keeps the pass/fail counts. kigroup only ever talks to it
//! through the [`Harness`] trait.
//!
//! Every thread has its own installed harness, [`TapHarness`] writing to
//! stdout unless [`set_harness`] replaced it. Test code never calls the
//! harness directly, it goes through [`ok`](crate::ok), [`skip`](crate::skip)
//! and [`diag`](crate::diag), which may be intercepted by a running group.

use std::{cell::RefCell, panic::Location};

mod no;
pub use no::*;

mod tap;
pub use tap::*;

mod channel;
pub use channel::*;

/// A single pass/fail result as handed to a [`Harness`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report<'r> {
    pub status: bool,
    pub name: &'r str,

    /// The TODO excuse in effect when the result was recorded.
    pub todo: Option<&'r str>,

    /// Where the result was recorded from.
    pub location: &'static Location<'static>,
}

/// The external reporting harness.
///
/// Implementations are only ever called from the thread they are installed on.
pub trait Harness {
    /// Record one pass/fail result.
    fn report(&mut self, report: Report<'_>);

    /// Record one skipped result.
    fn report_skip(&mut self, reason: Option<&str>);

    /// Emit a free form diagnostic message.
    fn diagnostic(&mut self, text: &str);

    /// Called once all results have been recorded.
    fn done_testing(&mut self) {}
}

thread_local! {
    static HARNESS: RefCell<Box<dyn Harness>> = RefCell::new(Box::new(TapHarness::default()));
}

/// Install `harness` for the current thread and return the previous one.
pub fn set_harness<H: Harness + 'static>(harness: H) -> Box<dyn Harness> {
    HARNESS.with_borrow_mut(|installed| std::mem::replace(installed, Box::new(harness)))
}

/// Run `f` with the harness installed on the current thread.
///
/// This bypasses any interception, so it always reaches the real harness.
pub fn with_harness<R>(f: impl FnOnce(&mut dyn Harness) -> R) -> R {
    HARNESS.with_borrow_mut(|harness| f(harness.as_mut()))
}

/// Tell the installed harness that no more results will follow.
pub fn done_testing() {
    with_harness(|harness| harness.done_testing())
}

/// The message emitted for a failing result, shaped after the usual TAP producers.
pub fn failure_diagnostic(name: &str, todo: bool, location: &Location<'_>) -> String {
    let failed = match todo {
        true => "Failed (TODO)",
        false => "Failed",
    };
    match name.is_empty() {
        true => format!(
            "  {failed} test at {} line {}.",
            location.file(),
            location.line()
        ),
        false => format!(
            "  {failed} test '{name}'\n  at {} line {}.",
            location.file(),
            location.line()
        ),
    }
}
