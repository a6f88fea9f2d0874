//! Deciding which groups run at all.
//!
//! Before a group body executes, the group asks [`should_skip`] whether it
//! may run. Two independent mechanisms can say no:
//! - a skip counter, set with [`skip_next`] or [`skip_indefinitely`], which
//!   skips the next groups regardless of their names
//! - a name filter, set with [`set_name_filter`], which only lets matching
//!   groups through
//!
//! The counter is checked first. A skipped group is still reported, as a
//! skip carrying the reason given here.

use std::{cell::RefCell, fmt, num::NonZeroUsize};

use regex::Regex;

use crate::error::Error;

/// How many upcoming groups are skipped regardless of their name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkipCounter {
    #[default]
    Off,
    Remaining(NonZeroUsize),
    Indefinite,
}

impl fmt::Display for SkipCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipCounter::Off => f.write_str("not skipping"),
            SkipCounter::Remaining(n) => write!(f, "{n} more to skip"),
            SkipCounter::Indefinite => f.write_str("skipping until cancelled"),
        }
    }
}

type NamePredicate = Box<dyn Fn(&str) -> bool>;

/// Which group names may run.
pub enum NameFilter {
    /// Every group runs.
    Any,
    /// Only the group with exactly this name runs.
    Exact(String),
    /// Only groups whose name matches the pattern run.
    Pattern(Regex),
    /// Only groups for which the predicate returns `true` run.
    Predicate(NamePredicate),
}

impl NameFilter {
    pub fn predicate(f: impl Fn(&str) -> bool + 'static) -> Self {
        Self::Predicate(Box::new(f))
    }

    fn into_predicate(self) -> NamePredicate {
        match self {
            NameFilter::Any => Box::new(|_: &str| true),
            NameFilter::Exact(exact) => Box::new(move |name: &str| name == exact),
            NameFilter::Pattern(pattern) => Box::new(move |name: &str| pattern.is_match(name)),
            NameFilter::Predicate(predicate) => predicate,
        }
    }
}

impl fmt::Debug for NameFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "Any"),
            Self::Exact(exact) => f.debug_tuple("Exact").field(exact).finish(),
            Self::Pattern(pattern) => f.debug_tuple("Pattern").field(pattern).finish(),
            Self::Predicate(_) => write!(f, "Predicate(...)"),
        }
    }
}

impl From<&str> for NameFilter {
    fn from(value: &str) -> Self {
        Self::Exact(value.to_string())
    }
}

impl From<String> for NameFilter {
    fn from(value: String) -> Self {
        Self::Exact(value)
    }
}

impl From<Regex> for NameFilter {
    fn from(value: Regex) -> Self {
        Self::Pattern(value)
    }
}

impl<T: Into<NameFilter>> From<Option<T>> for NameFilter {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(NameFilter::Any)
    }
}

/// The answer of [`should_skip`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipDecision {
    Run,
    Skip { reason: Option<String> },
}

impl SkipDecision {
    pub fn is_skip(&self) -> bool {
        matches!(self, SkipDecision::Skip { .. })
    }
}

struct SkipControl {
    counter: SkipCounter,
    skip_reason: Option<String>,
    filter: NamePredicate,
    filter_reason: Option<String>,
}

impl Default for SkipControl {
    fn default() -> Self {
        Self {
            counter: SkipCounter::Off,
            skip_reason: None,
            filter: NameFilter::Any.into_predicate(),
            filter_reason: None,
        }
    }
}

impl SkipControl {
    fn start_skipping(&mut self, counter: SkipCounter, reason: Option<&str>) -> Result<(), Error> {
        if self.counter != SkipCounter::Off {
            return Err(Error::AlreadySkipping {
                remaining: self.counter,
            });
        }
        self.counter = counter;
        self.skip_reason = reason.map(str::to_string);
        Ok(())
    }

    fn should_skip(&mut self, name: &str) -> SkipDecision {
        match self.counter {
            SkipCounter::Off => {}
            SkipCounter::Indefinite => {
                return SkipDecision::Skip {
                    reason: self.skip_reason.clone(),
                };
            }
            SkipCounter::Remaining(n) => {
                let reason = match NonZeroUsize::new(n.get() - 1) {
                    Some(left) => {
                        self.counter = SkipCounter::Remaining(left);
                        self.skip_reason.clone()
                    }
                    None => {
                        self.counter = SkipCounter::Off;
                        self.skip_reason.take()
                    }
                };
                return SkipDecision::Skip { reason };
            }
        }

        match (self.filter)(name) {
            true => SkipDecision::Run,
            false => SkipDecision::Skip {
                reason: self.filter_reason.clone(),
            },
        }
    }
}

thread_local! {
    static CONTROL: RefCell<SkipControl> = RefCell::new(SkipControl::default());
}

/// Skip the next `count` groups, reporting them as skipped with `reason`.
///
/// Fails if a counted or open-ended skip is already active. A count of zero
/// skips nothing.
pub fn skip_next(count: usize, reason: Option<&str>) -> Result<(), Error> {
    let counter = match NonZeroUsize::new(count) {
        Some(count) => SkipCounter::Remaining(count),
        None => SkipCounter::Off,
    };
    CONTROL.with_borrow_mut(|control| control.start_skipping(counter, reason))
}

/// Skip only the next group.
pub fn skip_next_test(reason: Option<&str>) -> Result<(), Error> {
    skip_next(1, reason)
}

/// Skip every group until [`cancel_indefinite_skip`] is called.
pub fn skip_indefinitely(reason: Option<&str>) -> Result<(), Error> {
    CONTROL.with_borrow_mut(|control| control.start_skipping(SkipCounter::Indefinite, reason))
}

/// Stop skipping groups, whether the skip was counted or open-ended.
pub fn cancel_indefinite_skip() {
    CONTROL.with_borrow_mut(|control| {
        control.counter = SkipCounter::Off;
        control.skip_reason = None;
    });
}

pub fn skip_state() -> SkipCounter {
    CONTROL.with_borrow(|control| control.counter)
}

/// Only run groups accepted by `filter`, skipping the others with `reason`.
///
/// Passing [`NameFilter::Any`] (or `None`) lets every group run again.
pub fn set_name_filter(filter: impl Into<NameFilter>, reason: Option<&str>) {
    let filter = filter.into();
    tracing::debug!(?filter, "name filter set");
    let predicate = filter.into_predicate();
    CONTROL.with_borrow_mut(|control| {
        control.filter = predicate;
        control.filter_reason = reason.map(str::to_string);
    });
}

pub fn reset_name_filter() {
    set_name_filter(NameFilter::Any, None);
}

/// Decide whether the group called `name` runs, consuming one counted skip if it does not.
pub fn should_skip(name: &str) -> SkipDecision {
    let decision = CONTROL.with_borrow_mut(|control| control.should_skip(name));
    if let SkipDecision::Skip { reason } = &decision {
        tracing::debug!(group = name, ?reason, "skipping group");
    }
    decision
}
