//! Settings shared by every group run on the current thread.
//!
//! - verbosity: `0` is silent, `1` announces each group before it runs, `2`
//!   also prints a short summary after each group finished
//! - exception catching: when enabled (the default) a panicking group body is
//!   recorded as a failed group, otherwise the panic continues unwinding out
//!   of [`Group::run`](crate::Group::run)
//! - log file: when set, the text of caught exceptions goes there instead of
//!   into the harness diagnostics

use std::{
    cell::RefCell,
    fs::{File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::error::Error;

#[derive(Debug)]
struct Settings {
    verbosity: u8,
    catch_exceptions: bool,
    logfile: Option<Logfile>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            verbosity: 0,
            catch_exceptions: true,
            logfile: None,
        }
    }
}

#[derive(Debug)]
struct Logfile {
    path: PathBuf,
    file: File,
}

thread_local! {
    static SETTINGS: RefCell<Settings> = RefCell::new(Settings::default());
}

pub fn set_verbosity(level: u8) {
    SETTINGS.with_borrow_mut(|settings| settings.verbosity = level);
}

pub fn verbosity() -> u8 {
    SETTINGS.with_borrow(|settings| settings.verbosity)
}

/// Enable or disable catching panics raised by group bodies.
pub fn catch_exceptions(enabled: bool) {
    SETTINGS.with_borrow_mut(|settings| settings.catch_exceptions = enabled);
}

pub fn catches_exceptions() -> bool {
    SETTINGS.with_borrow(|settings| settings.catch_exceptions)
}

/// Send the text of caught exceptions to the file at `path`.
///
/// The file is opened for appending and kept open. Setting the same path
/// again keeps the handle that is already open.
pub fn set_logfile(path: impl AsRef<Path>) -> Result<(), Error> {
    let path = path.as_ref();
    let already_open = SETTINGS.with_borrow(|settings| {
        settings
            .logfile
            .as_ref()
            .is_some_and(|logfile| logfile.path == path)
    });
    if already_open {
        return Ok(());
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| Error::Logfile {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::debug!(path = %path.display(), "opened exception log file");

    SETTINGS.with_borrow_mut(|settings| {
        settings.logfile = Some(Logfile {
            path: path.to_path_buf(),
            file,
        })
    });
    Ok(())
}

pub fn clear_logfile() {
    SETTINGS.with_borrow_mut(|settings| settings.logfile = None);
}

pub fn logfile_path() -> Option<PathBuf> {
    SETTINGS.with_borrow(|settings| settings.logfile.as_ref().map(|logfile| logfile.path.clone()))
}

/// Append `text` to the log file.
///
/// Returns the path written to, or `None` if no log file is set or writing failed.
pub(crate) fn write_log(text: &str) -> Option<PathBuf> {
    SETTINGS.with_borrow_mut(|settings| {
        let logfile = settings.logfile.as_mut()?;
        let written = writeln!(logfile.file, "{text}").and_then(|_| logfile.file.flush());
        match written {
            Ok(()) => Some(logfile.path.clone()),
            Err(err) => {
                tracing::warn!(
                    path = %logfile.path.display(),
                    error = %err,
                    "failed to write exception log"
                );
                None
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn defaults() {
        assert_eq!(verbosity(), 0);
        assert!(catches_exceptions());
        assert_eq!(logfile_path(), None);
        assert_eq!(write_log("dropped"), None);
    }

    #[test]
    fn logfile_appends_across_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("groups.log");

        set_logfile(&path).unwrap();
        assert_eq!(write_log("first").as_deref(), Some(path.as_path()));
        set_logfile(&path).unwrap();
        assert_eq!(write_log("second").as_deref(), Some(path.as_path()));
        clear_logfile();
        assert_eq!(write_log("third"), None);

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn unopenable_logfile_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("groups.log");

        let err = set_logfile(&path).unwrap_err();
        assert!(matches!(err, Error::Logfile { .. }));
        assert_eq!(logfile_path(), None);
    }
}
