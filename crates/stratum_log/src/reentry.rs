//! Per-thread reentrancy tracking for lock-holding writers.
//!
//! The sink and the dispatcher both hold a non-reentrant lock while calling
//! out to user code. A call that comes back into the same owner on the same
//! thread is refused instead of waiting on itself.

use std::cell::RefCell;

thread_local! {
    static ACTIVE: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Marks `owner` as entered on this thread until dropped.
pub(crate) struct ReentryGuard(usize);

impl ReentryGuard {
    /// `None` when this thread is already inside `owner`.
    pub(crate) fn enter<T>(owner: &T) -> Option<Self> {
        let key = owner as *const T as usize;
        ACTIVE.with(|active| {
            let mut active = active.borrow_mut();
            if active.contains(&key) {
                return None;
            }
            active.push(key);
            Some(ReentryGuard(key))
        })
    }
}

impl Drop for ReentryGuard {
    fn drop(&mut self) {
        ACTIVE.with(|active| active.borrow_mut().retain(|key| *key != self.0));
    }
}
