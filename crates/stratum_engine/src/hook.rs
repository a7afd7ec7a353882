//! Lifecycle hooks.
//!
//! Hooks observe a running context. Every callback defaults to a no-op that
//! lets the operation continue.

use stratum_log::log_printf;

use crate::diagnostics::Diagnostics;
use crate::plan::ResourceChange;
use crate::state::{ResourceInstance, State};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookAction {
    Continue,
    /// Stop the running operation after the current step.
    Halt,
}

pub trait Hook: Send + Sync {
    fn pre_refresh(&self, resource: &ResourceInstance) -> HookAction {
        let _ = resource;
        HookAction::Continue
    }

    fn post_refresh(&self, address: &str, refreshed: Option<&ResourceInstance>) -> HookAction {
        let _ = (address, refreshed);
        HookAction::Continue
    }

    fn pre_apply(&self, change: &ResourceChange) -> HookAction {
        let _ = change;
        HookAction::Continue
    }

    fn post_apply(&self, change: &ResourceChange, error: Option<&Diagnostics>) -> HookAction {
        let _ = (change, error);
        HookAction::Continue
    }

    fn provision_output(&self, address: &str, provisioner: &str, line: &str) {
        let _ = (address, provisioner, line);
    }

    fn post_state_update(&self, state: &State) -> HookAction {
        let _ = state;
        HookAction::Continue
    }
}

/// Writes provisioner output to the process-wide log sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogHook;

impl Hook for LogHook {
    fn provision_output(&self, _address: &str, provisioner: &str, line: &str) {
        log_printf!("[INFO] {}: {}", provisioner, line);
    }
}
