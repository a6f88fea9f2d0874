//! Panics raised by group bodies.
//!
//! A group body fails hard by panicking, by returning an `Err`, or by calling
//! [`raise`]. Either way the group captures the payload as a [`Caught`] value
//! and only turns it into text when the group is reported.

use std::{
    any::Any,
    cell::Cell,
    error::Error as StdError,
    fmt::{self, Debug, Display},
    panic::{self, Location},
    sync::Once,
};

/// A structured panic payload.
///
/// Panicking with a plain string works fine, this type exists for payloads
/// that know how to render themselves: errors (with their source chain) and
/// arbitrary [`Debug`] values.
pub struct Exception(Repr);

enum Repr {
    Error(Box<dyn StdError + Send + Sync>),
    Dump(Box<dyn Debug + Send + Sync>),
}

impl Exception {
    /// Wrap an error, rendered through [`Display`] followed by its sources.
    pub fn new(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self(Repr::Error(err.into()))
    }

    /// Wrap any value, rendered as its pretty [`Debug`] output.
    pub fn dump<T: Debug + Send + Sync + 'static>(value: T) -> Self {
        Self(Repr::Dump(Box::new(value)))
    }

    pub fn render(&self) -> String {
        match &self.0 {
            Repr::Error(err) => {
                let mut text = err.to_string();
                let mut source = err.source();
                while let Some(err) = source {
                    text.push_str("\n  caused by: ");
                    text.push_str(&err.to_string());
                    source = err.source();
                }
                text
            }
            Repr::Dump(value) => format!("{value:#?}"),
        }
    }
}

impl Debug for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Repr::Error(err) => f.debug_tuple("Exception").field(err).finish(),
            Repr::Dump(value) => f.debug_tuple("Exception").field(value).finish(),
        }
    }
}

impl Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Abort the current group body with `exception` as payload.
///
/// Unlike `panic!` this does not invoke the panic hook, so the caught
/// exception carries no location.
pub fn raise(exception: impl Into<Exception>) -> ! {
    forget_panic_location();
    panic::resume_unwind(Box::new(exception.into()))
}

impl<E: StdError + Send + Sync + 'static> From<E> for Exception {
    fn from(err: E) -> Self {
        Exception::new(err)
    }
}

/// Where a caught panic was raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl From<&Location<'_>> for PanicLocation {
    fn from(location: &Location<'_>) -> Self {
        Self {
            file: location.file().to_string(),
            line: location.line(),
            column: location.column(),
        }
    }
}

/// A panic payload captured from a group body.
pub struct Caught {
    payload: Box<dyn Any + Send + 'static>,
    location: Option<PanicLocation>,
}

impl Caught {
    pub(crate) fn new(payload: Box<dyn Any + Send + 'static>) -> Self {
        Self {
            payload,
            location: take_panic_location(),
        }
    }

    pub fn payload(&self) -> &(dyn Any + Send) {
        self.payload.as_ref()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref()
    }

    pub fn location(&self) -> Option<&PanicLocation> {
        self.location.as_ref()
    }

    pub fn into_payload(self) -> Box<dyn Any + Send + 'static> {
        self.payload
    }

    /// Best effort text for the payload.
    ///
    /// [`Exception`] payloads render themselves, string payloads are used as
    /// they are. An empty string becomes "a blank exception" and any other
    /// payload "an undefined exception".
    pub fn render(&self) -> String {
        let text = if let Some(exception) = self.downcast_ref::<Exception>() {
            exception.render()
        } else if let Some(s) = self.downcast_ref::<&'static str>() {
            s.to_string()
        } else if let Some(s) = self.downcast_ref::<String>() {
            s.clone()
        } else {
            String::from("an undefined exception")
        };

        let text = match text.is_empty() {
            true => String::from("a blank exception"),
            false => text,
        };

        match &self.location {
            Some(PanicLocation { file, line, .. }) => format!("{text} at {file} line {line}."),
            None => text,
        }
    }
}

impl Debug for Caught {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Caught")
            .field("payload", &self.render())
            .field("location", &self.location)
            .finish()
    }
}

static INSTALL_HOOK: Once = Once::new();

thread_local! {
    static QUIET: Cell<usize> = const { Cell::new(0) };
    static LAST_PANIC: Cell<Option<PanicLocation>> = const { Cell::new(None) };
}

/// Keeps panics on the current thread out of the previous panic hook while alive.
///
/// The location of a quiet panic is remembered and picked up by the next
/// [`Caught`] created on this thread.
#[derive(Debug)]
pub(crate) struct QuietPanics(());

impl QuietPanics {
    pub(crate) fn enter() -> Self {
        install_panic_hook();
        forget_panic_location();
        QUIET.with(|quiet| quiet.set(quiet.get() + 1));
        Self(())
    }
}

impl Drop for QuietPanics {
    fn drop(&mut self) {
        QUIET.with(|quiet| quiet.set(quiet.get().saturating_sub(1)));
    }
}

fn install_panic_hook() {
    INSTALL_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let quiet = QUIET.try_with(|quiet| quiet.get() > 0).unwrap_or(false);
            if !quiet {
                return previous(info);
            }
            let location = info.location().map(PanicLocation::from);
            let _ = LAST_PANIC.try_with(|last| last.set(location));
        }));
    });
}

fn take_panic_location() -> Option<PanicLocation> {
    LAST_PANIC.try_with(Cell::take).ok().flatten()
}

/// Drop the location of a quiet panic that never became a [`Caught`].
pub(crate) fn forget_panic_location() {
    let _ = take_panic_location();
}
