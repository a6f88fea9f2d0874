use crossbeam_channel::Receiver;

use crate::harness::{ChannelHarness, HarnessEvent, set_harness};

/// Install a [`ChannelHarness`] on the current test thread.
pub fn channel_harness() -> Receiver<HarnessEvent> {
    let (harness, rx) = ChannelHarness::unbounded();
    set_harness(harness);
    rx
}

pub fn drain(rx: &Receiver<HarnessEvent>) -> Vec<HarnessEvent> {
    rx.try_iter().collect()
}

/// The `(status, name, todo)` of every report event, other events dropped.
pub fn reports(events: &[HarnessEvent]) -> Vec<(bool, &str, Option<&str>)> {
    events
        .iter()
        .filter_map(|event| match event {
            HarnessEvent::Report {
                status, name, todo, ..
            } => Some((*status, name.as_str(), todo.as_deref())),
            _ => None,
        })
        .collect()
}

pub fn diagnostics(events: &[HarnessEvent]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|event| match event {
            HarnessEvent::Diagnostic(text) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

macro_rules! subtest {
    (pass) => {
        $crate::subtest::Subtest::new(true, None)
    };
    (fail) => {
        $crate::subtest::Subtest::new(false, None)
    };
    (pass, todo: $todo:expr) => {
        $crate::subtest::Subtest::new(true, Some(String::from($todo)))
    };
    (fail, todo: $todo:expr) => {
        $crate::subtest::Subtest::new(false, Some(String::from($todo)))
    };
}

pub(crate) use subtest;
