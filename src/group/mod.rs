//! Running a named group of results as one result.
//!
//! A group wraps a body that records any number of results through
//! [`ok`](crate::ok), [`skip`](crate::skip) and [`diag`](crate::diag). While
//! the body runs, those results are collected by the group instead of the
//! harness. Once the body is done, the group boils them down to a single
//! [`Verdict`](crate::subtest::Verdict) and reports that upstream.
//!
//! Groups nest. A group started inside another group's body reports its
//! verdict to the enclosing group, which sees it as one more result.
//!
//! Running a group takes these steps:
//! 1. pending [plugins](crate::plugin) are wrapped around the body
//! 2. the [skip controls](crate::control) decide whether the body runs at all
//! 3. interception starts, the body runs without the caller's TODO excuse and
//!    any panic is caught
//! 4. interception ends, a caught panic is kept or sent further up depending
//!    on [`catches_exceptions`](crate::config::catches_exceptions)

use std::{borrow::Cow, fmt, panic, rc::Rc};

use crate::{
    config,
    control::{self, SkipDecision},
    dispatch::{self, Interception, Recorder},
    exception::{self, Caught, Exception, QuietPanics},
    plugin::{self, Next},
    todo,
};

mod outcome;
pub use outcome::*;

/// What a group body returns.
///
/// Bodies usually return `()`. Bodies returning `Result<(), E>` fail hard
/// on `Err`, just like a panic would. `E` is either an [`Exception`] or an
/// error type, which is rendered through its `Display` text and sources.
/// Values that only implement `Debug` go through
/// `.map_err(Exception::dump)` first.
#[derive(Debug)]
pub struct GroupResult(pub Result<(), Exception>);

impl From<()> for GroupResult {
    fn from(_: ()) -> Self {
        Self(Ok(()))
    }
}

impl<E: Into<Exception>> From<Result<(), E>> for GroupResult {
    fn from(v: Result<(), E>) -> Self {
        GroupResult(v.map_err(Into::into))
    }
}

/// A group that is ready to run.
pub struct Group<'b> {
    name: Cow<'static, str>,
    body: Next<'b>,
    mute: bool,
    inherited_todo: Option<String>,
}

impl<'b> Group<'b> {
    /// Prepare the group `name` around `body`.
    ///
    /// The TODO excuse in effect right now is remembered and applies to the
    /// group's verdict. A group created while a muted group runs is muted too.
    pub fn new<F, T>(name: impl Into<Cow<'static, str>>, body: F) -> Self
    where
        F: FnOnce() -> T + 'b,
        T: Into<GroupResult>,
    {
        let body: Next<'b> = Box::new(move || {
            if let Err(exception) = body().into().0 {
                exception::raise(exception);
            }
        });

        Self {
            name: name.into(),
            body,
            mute: dispatch::active_is_muted(),
            inherited_todo: todo::current(),
        }
    }

    /// Suppress the diagnostics of this group, for testing groups themselves.
    pub fn muted(self, mute: bool) -> Self {
        Self { mute, ..self }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the group and return what happened.
    ///
    /// Nothing is reported yet, see [`GroupOutcome::report`].
    ///
    /// # Panics
    ///
    /// When exception catching is disabled, a panic of the body continues
    /// unwinding out of this call once interception ended.
    pub fn run(self) -> GroupOutcome {
        let Group {
            name,
            body,
            mute,
            inherited_todo,
        } = self;
        let body = plugin::drain_and_wrap(body);

        if let SkipDecision::Skip { reason } = control::should_skip(&name) {
            return GroupOutcome {
                name,
                mute,
                inherited_todo,
                status: GroupStatus::Skipped { reason },
            };
        }

        if config::verbosity() >= 1 {
            dispatch::diag(format!("Running group of tests - {name}"));
        }

        let recorder = Rc::new(Recorder::new(mute));
        let catching = config::catches_exceptions();
        let result = {
            let _quiet = catching.then(QuietPanics::enter);
            let _interception = Interception::activate(Rc::clone(&recorder));
            todo::cleared(body)
        };
        let subtests = recorder.take_subtests();

        let exception = match result {
            Ok(()) => {
                exception::forget_panic_location();
                None
            }
            Err(payload) if catching => {
                let caught = Caught::new(payload);
                tracing::debug!(group = %name, exception = ?caught, "group body died");
                Some(caught)
            }
            Err(payload) => panic::resume_unwind(payload),
        };

        let outcome = GroupOutcome {
            name,
            mute,
            inherited_todo,
            status: GroupStatus::Finished {
                subtests,
                exception,
            },
        };

        if config::verbosity() >= 2 {
            dispatch::diag(format!(
                "Finished group of tests - {}: {} subtests, {} failed",
                outcome.name(),
                outcome.subtests().len(),
                outcome.unexcused_failure_subtests().len()
            ));
        }

        outcome
    }
}

impl fmt::Debug for Group<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.name)
            .field("mute", &self.mute)
            .field("inherited_todo", &self.inherited_todo)
            .finish_non_exhaustive()
    }
}

/// Run `body` as the group `name` and report its verdict.
///
/// Returns whether the group passed. A skipped group counts as passed.
///
/// ```
/// use kigroup::{group, ok};
///
/// group("arithmetic", || {
///     ok(1 + 1 == 2, "addition");
///     ok(2 * 2 == 4, "multiplication");
/// });
/// ```
#[track_caller]
pub fn group<F, T>(name: impl Into<Cow<'static, str>>, body: F) -> bool
where
    F: FnOnce() -> T,
    T: Into<GroupResult>,
{
    Group::new(name, body).run().report()
}
