//! Local reference engine.
//!
//! Runs the whole cycle in-process against registered providers. Resources
//! are handled sequentially in declaration order; orphaned resources are
//! deleted afterwards in reverse address order.

mod context;
mod eval;
mod null;

use std::sync::Arc;

use crate::context::{Context, ContextOpts, Engine};
use crate::diagnostics::Diagnostics;
use crate::hook::{Hook, LogHook};
use crate::loader::{ConfigLoader, Loader, LoaderConfig};

pub use context::LocalContext;
pub use null::{NullProvider, NULL_PROVIDER, NULL_RESOURCE};

#[derive(Clone)]
pub struct LocalEngine {
    hooks: Vec<Arc<dyn Hook>>,
}

impl LocalEngine {
    /// Engine reporting provisioner output through [`LogHook`].
    pub fn new() -> Self {
        Self {
            hooks: vec![Arc::new(LogHook)],
        }
    }

    /// Engine with no hooks at all.
    pub fn without_hooks() -> Self {
        Self { hooks: Vec::new() }
    }

    pub fn with_hook(mut self, hook: Arc<dyn Hook>) -> Self {
        self.hooks.push(hook);
        self
    }
}

impl Default for LocalEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LocalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalEngine").field("hooks", &self.hooks.len()).finish()
    }
}

impl Engine for LocalEngine {
    fn loader(&self, config: LoaderConfig) -> Box<dyn ConfigLoader> {
        Box::new(Loader::new(config))
    }

    fn new_context(&self, opts: ContextOpts) -> Result<Box<dyn Context>, Diagnostics> {
        let context = LocalContext::new(opts, self.hooks.clone())?;
        Ok(Box::new(context))
    }
}
