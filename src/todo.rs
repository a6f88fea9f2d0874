//! The ambient TODO excuse.
//!
//! While a TODO excuse is set, results are still recorded but failures are
//! expected. The excuse is per thread and is picked up by [`ok`](crate::ok)
//! at the moment a result is recorded.
//!
//! An empty excuse still counts as "in TODO".

use std::{
    borrow::Cow,
    cell::{Cell, RefCell},
    panic::{self, AssertUnwindSafe},
    thread,
};

type Excuse = Option<Cow<'static, str>>;

thread_local! {
    /// Every excuse set by a live guard, innermost last, keyed by guard id.
    static TODO: RefCell<Vec<(u64, Excuse)>> = const { RefCell::new(Vec::new()) };
    static NEXT_ID: Cell<u64> = const { Cell::new(0) };
}

/// The TODO excuse currently in effect, if any.
pub fn current() -> Option<String> {
    TODO.with_borrow(|todo| {
        todo.last()
            .and_then(|(_, excuse)| excuse.as_deref())
            .map(str::to_string)
    })
}

/// Whether a TODO excuse is currently in effect.
pub fn is_set() -> bool {
    TODO.with_borrow(|todo| todo.last().is_some_and(|(_, excuse)| excuse.is_some()))
}

/// Removes its TODO excuse when dropped.
///
/// Guards may be dropped in any order. Dropping a guard only removes its own
/// excuse, the innermost excuse still alive stays in effect.
#[derive(Debug)]
#[must_use = "the TODO excuse is removed as soon as the guard is dropped"]
pub struct TodoGuard {
    id: u64,
}

impl TodoGuard {
    fn push(excuse: Excuse) -> Self {
        let id = NEXT_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            id
        });
        TODO.with_borrow_mut(|todo| todo.push((id, excuse)));
        Self { id }
    }
}

impl Drop for TodoGuard {
    fn drop(&mut self) {
        let _ = TODO.try_with(|todo| {
            let mut todo = todo.borrow_mut();
            if let Some(index) = todo.iter().rposition(|(id, _)| *id == self.id) {
                todo.remove(index);
            }
        });
    }
}

/// Set the TODO excuse until the returned guard is dropped.
pub fn set(reason: impl Into<Cow<'static, str>>) -> TodoGuard {
    TodoGuard::push(Some(reason.into()))
}

/// Run `f` with the TODO excuse set to `reason`.
pub fn scope<R>(reason: impl Into<Cow<'static, str>>, f: impl FnOnce() -> R) -> R {
    let _todo = set(reason);
    f()
}

/// Run `f` with no TODO excuse in effect and catch any panic.
///
/// The previous excuse is restored afterwards, whether `f` returned or
/// panicked. A panic is handed back as the error value.
pub(crate) fn cleared(f: impl FnOnce()) -> thread::Result<()> {
    let _todo = TodoGuard::push(None);
    panic::catch_unwind(AssertUnwindSafe(f))
}
