//! One-shot wrappers around the next group body.
//!
//! A plugin is registered with [`next_group_plugin`] and applies to the very
//! next group that is started on this thread, whether that group ends up
//! running or skipped. It receives the rest of the chain as a [`Next`] value
//! and decides when (and whether) to call it.
//!
//! Plugins registered first wrap outermost:
//!
//! ```
//! use kigroup::{group, ok, plugin::next_group_plugin};
//!
//! next_group_plugin(|next| {
//!     println!("outer before");
//!     next();
//! });
//! next_group_plugin(|next| {
//!     println!("inner before");
//!     next();
//! });
//! group("wrapped", || {
//!     ok(true, "runs last");
//! });
//! ```

use std::{
    cell::RefCell,
    panic::{self, AssertUnwindSafe},
};

/// The remaining part of a plugin chain, ending in the group body.
pub type Next<'a> = Box<dyn FnOnce() + 'a>;

type Plugin = Box<dyn FnOnce(Next<'_>)>;

thread_local! {
    static PENDING: RefCell<Vec<Plugin>> = const { RefCell::new(Vec::new()) };
}

/// Wrap the body of the next group started on this thread.
pub fn next_group_plugin(plugin: impl FnOnce(Next<'_>) + 'static) {
    PENDING.with_borrow_mut(|pending| pending.push(Box::new(plugin)));
}

/// Number of plugins waiting for the next group.
pub fn pending_plugins() -> usize {
    PENDING.with_borrow(|pending| pending.len())
}

/// Take every pending plugin and wrap them around `body`.
///
/// The queue is empty afterwards. Without pending plugins `body` is returned as is.
pub(crate) fn drain_and_wrap<'a>(body: Next<'a>) -> Next<'a> {
    let plugins = PENDING.with_borrow_mut(std::mem::take);
    if !plugins.is_empty() {
        tracing::debug!(count = plugins.len(), "wrapping group body in plugins");
    }
    plugins
        .into_iter()
        .rev()
        .fold(body, |next, plugin| -> Next<'a> { Box::new(move || plugin(next)) })
}

/// A plugin calling `before` ahead of the group body and `after` once it is done.
///
/// `after` also runs when the body panics. The body's panic continues once
/// `after` returned. If `after` panics itself, its panic is the one the group
/// sees and the body's payload is dropped.
pub fn around(
    before: impl FnOnce() + 'static,
    after: impl FnOnce() + 'static,
) -> impl FnOnce(Next<'_>) + 'static {
    move |next: Next<'_>| {
        before();
        let result = panic::catch_unwind(AssertUnwindSafe(next));
        after();
        if let Err(payload) = result {
            panic::resume_unwind(payload);
        }
    }
}
