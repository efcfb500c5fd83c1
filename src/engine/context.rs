//! Ambient "current suite" used while declaration bodies run.
//!
//! [`Suite::setup`] enters a [`SuiteGuard`] around each declaration body, the
//! registration functions in [`crate::engine::declare`] read the innermost
//! suite from here. The slot is thread-local and declaration bodies are
//! synchronous, so a body always sees the suite it was invoked for.

use crate::engine::error::{Error, Result};
use crate::engine::tree::Suite;
use std::cell::RefCell;
use std::sync::Arc;

thread_local! {
    static CURRENT_SUITE: RefCell<Vec<Arc<Suite>>> = RefCell::new(Vec::new());
}

/// Binds a suite as current until dropped, restoring the previous one.
pub(crate) struct SuiteGuard(());

impl SuiteGuard {
    pub(crate) fn enter(suite: Arc<Suite>) -> Self {
        CURRENT_SUITE.with(|slot| slot.borrow_mut().push(suite));
        SuiteGuard(())
    }
}

impl Drop for SuiteGuard {
    fn drop(&mut self) {
        CURRENT_SUITE.with(|slot| {
            slot.borrow_mut().pop();
        });
    }
}

pub fn current_suite() -> Result<Arc<Suite>> {
    CURRENT_SUITE.with(|slot| slot.borrow().last().cloned().ok_or(Error::NoActiveSuite))
}
