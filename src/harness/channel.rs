use std::panic::Location;

use crossbeam_channel::{Receiver, Sender};

use crate::harness::{Harness, Report};

/// An owned copy of a single call made into a [`Harness`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarnessEvent {
    Report {
        status: bool,
        name: String,
        todo: Option<String>,
        location: &'static Location<'static>,
    },
    Skip {
        reason: Option<String>,
    },
    Diagnostic(String),
    DoneTesting,
}

impl HarnessEvent {
    /// The status of a `Report` event, `None` for every other event.
    pub fn status(&self) -> Option<bool> {
        match self {
            HarnessEvent::Report { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<Report<'_>> for HarnessEvent {
    fn from(report: Report<'_>) -> Self {
        HarnessEvent::Report {
            status: report.status,
            name: report.name.to_string(),
            todo: report.todo.map(str::to_string),
            location: report.location,
        }
    }
}

/// A [`Harness`] that forwards every call over a channel.
///
/// The receiving end may live on another thread, for example one that renders
/// the events, or it can be drained directly by tests.
#[derive(Debug, Clone)]
pub struct ChannelHarness {
    sender: Sender<HarnessEvent>,
}

impl ChannelHarness {
    /// Create a harness backed by an unbounded channel.
    pub fn unbounded() -> (Self, Receiver<HarnessEvent>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Self { sender }, receiver)
    }

    pub fn from_sender(sender: Sender<HarnessEvent>) -> Self {
        Self { sender }
    }

    fn send(&self, event: HarnessEvent) {
        if let Err(err) = self.sender.send(event) {
            tracing::debug!(event = ?err.0, "harness event receiver is gone");
        }
    }
}

impl Harness for ChannelHarness {
    fn report(&mut self, report: Report<'_>) {
        self.send(report.into());
    }

    fn report_skip(&mut self, reason: Option<&str>) {
        self.send(HarnessEvent::Skip {
            reason: reason.map(str::to_string),
        });
    }

    fn diagnostic(&mut self, text: &str) {
        self.send(HarnessEvent::Diagnostic(text.to_string()));
    }

    fn done_testing(&mut self) {
        self.send(HarnessEvent::DoneTesting);
    }
}
