use std::fmt;

/// Placeholder used for a TODO excuse that was left empty.
pub const NO_EXPLANATION: &str = "no explanation given";

/// One result recorded inside a running group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtest {
    pub status: bool,

    /// The TODO excuse in effect when the result was recorded.
    pub todo: Option<String>,
}

impl Subtest {
    pub fn new(status: bool, todo: Option<String>) -> Self {
        Self { status, todo }
    }

    /// A failure that no TODO excuse covers.
    pub fn is_unexcused_failure(&self) -> bool {
        !self.status && self.todo.is_none()
    }

    /// A pass even though a TODO excuse expected it to fail.
    pub fn is_unexpected_success(&self) -> bool {
        self.status && self.todo.is_some()
    }

    pub fn is_todo(&self) -> bool {
        self.todo.is_some()
    }
}

/// The single result a group reports upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub ok: bool,
    pub todo: Option<String>,
}

impl Verdict {
    pub fn new(ok: bool, todo: Option<String>) -> Self {
        Self { ok, todo }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.ok, &self.todo) {
            (true, None) => f.write_str("ok"),
            (false, None) => f.write_str("not ok"),
            (true, Some(todo)) => write!(f, "ok # TODO {todo}"),
            (false, Some(todo)) => write!(f, "not ok # TODO {todo}"),
        }
    }
}

/// Join the TODO excuses of `subtests` into one excuse.
///
/// Empty excuses are replaced by [`NO_EXPLANATION`].
pub fn joined_excuse<'s>(subtests: impl IntoIterator<Item = &'s Subtest>) -> String {
    subtests
        .into_iter()
        .filter_map(|subtest| subtest.todo.as_deref())
        .map(|todo| match todo.is_empty() {
            true => NO_EXPLANATION,
            false => todo,
        })
        .collect::<Vec<_>>()
        .join(", ")
}
