use std::{io, path::PathBuf};

use crate::control::SkipCounter;

/// Errors produced by kigroup itself.
///
/// Failures inside a group body are never reported through this type, those
/// end up in the group's [`Caught`](crate::exception::Caught) slot instead.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A counted or open-ended skip was requested while another one is still active.
    #[error("already skipping groups ({remaining})")]
    AlreadySkipping { remaining: SkipCounter },

    /// A verdict was requested from a group that never ran.
    #[error("group `{name}` was skipped and has no verdict")]
    VerdictOfSkipped { name: String },

    /// The exception log file could not be opened.
    #[error("cannot open log file {}", path.display())]
    Logfile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
