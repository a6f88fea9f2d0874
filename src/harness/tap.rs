use std::{fmt, io};

use crate::harness::{Harness, Report, failure_diagnostic};

/// The default [`Harness`], writing numbered TAP lines to a target.
///
/// Results are numbered in the order they arrive. Failing results are
/// followed by a diagnostic naming the test and where it was recorded.
/// Failures under a TODO excuse are printed but not counted as failures.
///
/// Write errors never abort a run. They are collected and can be inspected
/// with [`errors`](Self::errors) once the run is over.
#[derive(Debug)]
pub struct TapHarness<W: io::Write> {
    target: W,
    count: usize,
    failed: usize,
    planned: Option<usize>,
    errors: Vec<io::Error>,
}

impl Default for TapHarness<io::Stdout> {
    fn default() -> Self {
        Self {
            target: io::stdout(),
            count: 0,
            failed: 0,
            planned: None,
            errors: Vec::new(),
        }
    }
}

impl<W: io::Write> TapHarness<W> {
    pub fn with_target<WithTarget: io::Write>(self, target: WithTarget) -> TapHarness<WithTarget> {
        TapHarness {
            target,
            count: self.count,
            failed: self.failed,
            planned: self.planned,
            errors: self.errors,
        }
    }

    pub fn target(&self) -> &W {
        &self.target
    }

    pub fn into_target(self) -> W {
        self.target
    }

    /// Announce the number of results up front.
    pub fn plan(&mut self, tests: usize) {
        self.planned = Some(tests);
        self.emit(format_args!("1..{tests}"));
    }

    /// Number of results recorded so far, skips included.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn passed(&self) -> usize {
        self.count - self.failed
    }

    pub fn errors(&self) -> &[io::Error] {
        &self.errors
    }

    fn emit(&mut self, line: fmt::Arguments<'_>) {
        let written = self
            .target
            .write_fmt(line)
            .and_then(|_| self.target.write_all(b"\n"));
        if let Err(err) = written {
            tracing::warn!(error = %err, "failed to write TAP line");
            self.errors.push(err);
        }
    }

    fn emit_comment(&mut self, text: &str) {
        for line in text.trim_end_matches('\n').lines() {
            match line.is_empty() {
                true => self.emit(format_args!("#")),
                false => self.emit(format_args!("# {line}")),
            }
        }
    }
}

impl<W: io::Write> Harness for TapHarness<W> {
    fn report(&mut self, report: Report<'_>) {
        self.count += 1;
        let counted_failure = !report.status && report.todo.is_none();
        if counted_failure {
            self.failed += 1;
        }

        let mut line = match report.status {
            true => format!("ok {}", self.count),
            false => format!("not ok {}", self.count),
        };
        if !report.name.is_empty() {
            line.push_str(" - ");
            line.push_str(&report.name.replace('#', "\\#"));
        }
        match report.todo {
            Some("") => line.push_str(" # TODO"),
            Some(todo) => {
                line.push_str(" # TODO ");
                line.push_str(todo);
            }
            None => {}
        }
        self.emit(format_args!("{line}"));

        if !report.status {
            let msg = failure_diagnostic(report.name, report.todo.is_some(), report.location);
            self.emit_comment(&msg);
        }
    }

    fn report_skip(&mut self, reason: Option<&str>) {
        self.count += 1;
        let count = self.count;
        match reason {
            Some(reason) if !reason.is_empty() => self.emit(format_args!("ok {count} # skip {reason}")),
            _ => self.emit(format_args!("ok {count} # skip")),
        }
    }

    fn diagnostic(&mut self, text: &str) {
        self.emit_comment(text);
    }

    fn done_testing(&mut self) {
        if self.planned.is_none() {
            let count = self.count;
            self.emit(format_args!("1..{count}"));
        }
    }
}
