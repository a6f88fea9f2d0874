use crate::harness::{Harness, Report};

/// A [`Harness`] that drops every result and diagnostic.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHarness;

impl Harness for NoHarness {
    fn report(&mut self, _: Report<'_>) {}

    fn report_skip(&mut self, _: Option<&str>) {}

    fn diagnostic(&mut self, _: &str) {}
}
