//! Routing of results to the innermost running group.
//!
//! [`ok`], [`skip`] and [`diag`] are the calls test code makes to record
//! results. Each call checks, at call time, whether a group is running on
//! this thread. If one is, the call is recorded by that group and never
//! reaches the harness. Otherwise it goes straight to the installed harness.
//!
//! Running groups form a stack: a group started inside another group's body
//! takes over until it finishes, then the outer group receives calls again.

use std::{cell::RefCell, panic::Location, rc::Rc};

use crate::{
    harness::{Report, failure_diagnostic, with_harness},
    subtest::Subtest,
    todo,
};

/// Collects the results of one running group.
#[derive(Debug)]
pub(crate) struct Recorder {
    subtests: RefCell<Vec<Subtest>>,
    mute: bool,
}

impl Recorder {
    pub(crate) fn new(mute: bool) -> Self {
        Self {
            subtests: RefCell::default(),
            mute,
        }
    }

    pub(crate) fn take_subtests(&self) -> Vec<Subtest> {
        self.subtests.take()
    }

    fn ok(&self, status: bool, name: &str, todo: Option<String>, location: &Location<'_>) {
        tracing::trace!(status, name, ?todo, "subtest recorded");
        let is_todo = todo.is_some();
        self.subtests.borrow_mut().push(Subtest::new(status, todo));

        if !status && !self.mute {
            let msg = failure_diagnostic(name, is_todo, location);
            with_harness(|harness| harness.diagnostic(&msg));
        }
    }

    fn skip(&self) {
        self.subtests.borrow_mut().push(Subtest::new(true, None));
    }

    fn diag(&self, text: &str) {
        if !self.mute {
            with_harness(|harness| harness.diagnostic(text));
        }
    }
}

thread_local! {
    static ACTIVE: RefCell<Vec<Rc<Recorder>>> = const { RefCell::new(Vec::new()) };
}

fn active() -> Option<Rc<Recorder>> {
    ACTIVE.with_borrow(|active| active.last().cloned())
}

/// Whether results are currently recorded by a group instead of the harness.
pub fn is_intercepting() -> bool {
    ACTIVE.with_borrow(|active| !active.is_empty())
}

pub(crate) fn active_is_muted() -> bool {
    active().is_some_and(|recorder| recorder.mute)
}

/// Routes results to a recorder for as long as it is alive.
///
/// Dropping it hands routing back to whatever was active before, which is
/// the harness for the outermost group and the enclosing group otherwise.
#[derive(Debug)]
#[must_use = "interception ends as soon as the guard is dropped"]
pub(crate) struct Interception {
    depth: usize,
}

impl Interception {
    pub(crate) fn activate(recorder: Rc<Recorder>) -> Self {
        let depth = ACTIVE.with_borrow_mut(|active| {
            active.push(recorder);
            active.len()
        });
        match depth {
            1 => tracing::debug!("intercepting harness"),
            depth => tracing::debug!(depth, "nested group takes over interception"),
        }
        Self { depth }
    }
}

impl Drop for Interception {
    fn drop(&mut self) {
        ACTIVE.with_borrow_mut(|active| active.truncate(self.depth - 1));
        match self.depth {
            1 => tracing::debug!("harness interception released"),
            depth => tracing::debug!(depth, "interception handed back to enclosing group"),
        }
    }
}

/// Record a pass (`true`) or failure (`false`) called `name`.
///
/// Returns `status` so it can be used in conditions.
#[track_caller]
pub fn ok(status: bool, name: &str) -> bool {
    ok_at(status, name, Location::caller())
}

pub(crate) fn ok_at(status: bool, name: &str, location: &'static Location<'static>) -> bool {
    let todo = todo::current();
    match active() {
        Some(recorder) => recorder.ok(status, name, todo, location),
        None => with_harness(|harness| {
            harness.report(Report {
                status,
                name,
                todo: todo.as_deref(),
                location,
            })
        }),
    }
    status
}

/// Record a skipped result.
///
/// Inside a group a skipped result counts as a pass and the reason is dropped.
pub fn skip(reason: Option<&str>) {
    match active() {
        Some(recorder) => recorder.skip(),
        None => with_harness(|harness| harness.report_skip(reason)),
    }
}

/// Emit a diagnostic message.
///
/// Inside a muted group the message is dropped.
pub fn diag(text: impl AsRef<str>) {
    let text = text.as_ref();
    match active() {
        Some(recorder) => recorder.diag(text),
        None => with_harness(|harness| harness.diagnostic(text)),
    }
}
