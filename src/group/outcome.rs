use std::{borrow::Cow, panic::Location, sync::LazyLock};

use regex::Regex;

use crate::{
    config,
    dispatch,
    error::Error,
    exception::Caught,
    subtest::{Subtest, Verdict, joined_excuse},
    todo,
};

/// Prefix for the reported name of a group whose body died.
pub const DIED_MARKER: &str = "*died* ";

static TODO_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bTODO\b").expect("valid regex"));

/// What became of a group.
#[derive(Debug)]
pub enum GroupStatus {
    /// The body never ran.
    Skipped { reason: Option<String> },

    /// The body ran, possibly dying halfway.
    Finished {
        subtests: Vec<Subtest>,
        exception: Option<Caught>,
    },
}

/// A group that has been run (or skipped) but not necessarily reported.
#[derive(Debug)]
pub struct GroupOutcome {
    pub(super) name: Cow<'static, str>,
    pub(super) mute: bool,
    pub(super) inherited_todo: Option<String>,
    pub(super) status: GroupStatus,
}

impl GroupOutcome {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> &GroupStatus {
        &self.status
    }

    pub fn is_muted(&self) -> bool {
        self.mute
    }

    /// The TODO excuse that was in effect when the group was created.
    pub fn inherited_todo(&self) -> Option<&str> {
        self.inherited_todo.as_deref()
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, GroupStatus::Skipped { .. })
    }

    /// Why the group was skipped. May be `None` even for a skipped group.
    pub fn skip_reason(&self) -> Option<&str> {
        match &self.status {
            GroupStatus::Skipped { reason } => reason.as_deref(),
            GroupStatus::Finished { .. } => None,
        }
    }

    pub fn got_exception(&self) -> bool {
        self.exception().is_some()
    }

    /// The payload the body died with.
    ///
    /// When a plugin catches the body's panic and then panics itself, the
    /// plugin's payload is the one kept here. The original one is gone.
    pub fn exception(&self) -> Option<&Caught> {
        match &self.status {
            GroupStatus::Finished { exception, .. } => exception.as_ref(),
            GroupStatus::Skipped { .. } => None,
        }
    }

    /// Every recorded result, in order. Empty for a skipped group.
    pub fn subtests(&self) -> &[Subtest] {
        match &self.status {
            GroupStatus::Finished { subtests, .. } => subtests,
            GroupStatus::Skipped { .. } => &[],
        }
    }

    pub fn unexcused_failure_subtests(&self) -> Vec<&Subtest> {
        self.subtests_where(Subtest::is_unexcused_failure)
    }

    pub fn unexpected_success_subtests(&self) -> Vec<&Subtest> {
        self.subtests_where(Subtest::is_unexpected_success)
    }

    pub fn todo_subtests(&self) -> Vec<&Subtest> {
        self.subtests_where(Subtest::is_todo)
    }

    fn subtests_where(&self, f: impl Fn(&Subtest) -> bool) -> Vec<&Subtest> {
        self.subtests().iter().filter(|&subtest| f(subtest)).collect()
    }

    /// Boil the recorded results down to one verdict.
    ///
    /// - a dead body, no results at all or an unexcused failure fail the group
    /// - otherwise unexpected successes pass it with their TODO excuses
    /// - otherwise excused failures fail it with their TODO excuses
    /// - otherwise the group passes
    ///
    /// A verdict without excuse picks one up from the group name when it
    /// contains the word `TODO`, or else from the inherited TODO excuse.
    pub fn compute_verdict(&self) -> Result<Verdict, Error> {
        match &self.status {
            GroupStatus::Finished {
                subtests,
                exception,
            } => Ok(self.verdict(subtests, exception.is_some())),
            GroupStatus::Skipped { .. } => Err(Error::VerdictOfSkipped {
                name: self.name.to_string(),
            }),
        }
    }

    fn verdict(&self, subtests: &[Subtest], died: bool) -> Verdict {
        let mut verdict = if died
            || subtests.is_empty()
            || subtests.iter().any(Subtest::is_unexcused_failure)
        {
            Verdict::new(false, None)
        } else if subtests.iter().any(Subtest::is_unexpected_success) {
            Verdict::new(true, Some(joined_excuse(self.unexpected_success_subtests())))
        } else if subtests.iter().any(Subtest::is_todo) {
            Verdict::new(false, Some(joined_excuse(self.todo_subtests())))
        } else {
            Verdict::new(true, None)
        };

        if verdict.todo.is_none() {
            verdict.todo = match TODO_WORD.is_match(&self.name) {
                true => Some(self.name.to_string()),
                false => self.inherited_todo.clone(),
            };
        }

        verdict
    }

    /// Report this group upstream as exactly one result.
    ///
    /// A skipped group is reported as a skip. A group whose body died first
    /// gets its exception written out, to the log file if one is set or as
    /// a diagnostic otherwise, and is reported under a `*died*` name.
    ///
    /// Returns whether the group passed. Skipped groups count as passed.
    #[track_caller]
    pub fn report(&self) -> bool {
        let location = Location::caller();
        let (subtests, exception) = match &self.status {
            GroupStatus::Skipped { reason } => {
                dispatch::skip(reason.as_deref());
                return true;
            }
            GroupStatus::Finished {
                subtests,
                exception,
            } => (subtests, exception),
        };

        let verdict = self.verdict(subtests, exception.is_some());

        let name = match exception {
            Some(caught) => {
                self.report_exception(caught);
                Cow::Owned(format!("{DIED_MARKER}{}", self.name))
            }
            None => Cow::Borrowed(self.name.as_ref()),
        };

        let _todo = verdict.todo.map(todo::set);
        dispatch::ok_at(verdict.ok, &name, location)
    }

    fn report_exception(&self, caught: &Caught) {
        let text = caught.render();
        let name = &self.name;
        let msg = match config::write_log(&format!("Test {name} died:\n{text}")) {
            Some(path) => format!("Test {name} died, see {}", path.display()),
            None => format!("Test {name} died:\n{text}"),
        };
        if !self.mute {
            dispatch::diag(msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_support::*;

    fn finished(name: &'static str, subtests: Vec<Subtest>) -> GroupOutcome {
        GroupOutcome {
            name: name.into(),
            mute: false,
            inherited_todo: None,
            status: GroupStatus::Finished {
                subtests,
                exception: None,
            },
        }
    }

    fn verdict(outcome: &GroupOutcome) -> (bool, Option<String>) {
        let Verdict { ok, todo } = outcome.compute_verdict().unwrap();
        (ok, todo)
    }

    #[test]
    fn no_subtests_fail() {
        assert_eq!(verdict(&finished("g", vec![])), (false, None));
    }

    #[test]
    fn all_passing_pass() {
        let outcome = finished("g", vec![subtest!(pass), subtest!(pass)]);
        assert_eq!(verdict(&outcome), (true, None));
    }

    #[test]
    fn unexcused_failure_wins() {
        let outcome = finished(
            "g",
            vec![
                subtest!(pass, todo: "a"),
                subtest!(fail),
                subtest!(fail, todo: "b"),
            ],
        );
        assert_eq!(verdict(&outcome), (false, None));
        assert_eq!(outcome.unexcused_failure_subtests(), [&subtest!(fail)]);
    }

    #[test]
    fn unexpected_success_passes_with_excuse() {
        let outcome = finished(
            "g",
            vec![
                subtest!(pass, todo: "a"),
                subtest!(fail, todo: "b"),
                subtest!(pass, todo: ""),
                subtest!(pass),
            ],
        );
        assert_eq!(
            verdict(&outcome),
            (true, Some("a, no explanation given".into()))
        );
        assert_eq!(outcome.todo_subtests().len(), 3);
    }

    #[test]
    fn excused_failures_fail_with_excuse() {
        let outcome = finished(
            "g",
            vec![subtest!(pass), subtest!(fail, todo: "a"), subtest!(fail, todo: "b")],
        );
        assert_eq!(verdict(&outcome), (false, Some("a, b".into())));
        assert!(outcome.unexpected_success_subtests().is_empty());
    }

    #[test]
    fn exception_fails_regardless() {
        let mut outcome = finished("g", vec![subtest!(pass)]);
        outcome.status = GroupStatus::Finished {
            subtests: vec![subtest!(pass)],
            exception: Some(Caught::new(Box::new("died"))),
        };
        assert_eq!(verdict(&outcome), (false, None));
    }

    #[test]
    fn todo_in_name_becomes_excuse() {
        let outcome = finished("parser TODO: unicode", vec![subtest!(fail)]);
        assert_eq!(
            verdict(&outcome),
            (false, Some("parser TODO: unicode".into()))
        );

        let outcome = finished("TODOS are not todo", vec![subtest!(pass)]);
        assert_eq!(verdict(&outcome), (true, None));
    }

    #[test]
    fn inherited_todo_is_last_resort() {
        let mut outcome = finished("g", vec![subtest!(pass)]);
        outcome.inherited_todo = Some("outer".into());
        assert_eq!(verdict(&outcome), (true, Some("outer".into())));

        outcome.status = GroupStatus::Finished {
            subtests: vec![subtest!(pass, todo: "own")],
            exception: None,
        };
        assert_eq!(verdict(&outcome), (true, Some("own".into())));
    }

    #[test]
    fn skipped_outcome_reports_skip() {
        let rx = channel_harness();
        let outcome = GroupOutcome {
            name: "skipped".into(),
            mute: false,
            inherited_todo: None,
            status: GroupStatus::Skipped { reason: None },
        };
        assert!(outcome.is_skipped());
        assert!(!outcome.got_exception());
        assert!(outcome.report());
        assert_eq!(
            drain(&rx),
            [crate::harness::HarnessEvent::Skip { reason: None }]
        );
    }

    #[test]
    fn report_carries_verdict_excuse() {
        let rx = channel_harness();
        let outcome = finished("g", vec![subtest!(pass, todo: "surprise")]);
        assert!(outcome.report());
        assert_eq!(todo::current(), None);
        assert_eq!(reports(&drain(&rx)), [(true, "g", Some("surprise"))]);
    }
}
