//! Execution engine contract.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::loader::{ConfigLoader, LoaderConfig};
use crate::plan::Plan;
use crate::provider::{ProviderResolver, ProvisionerFactory};
use crate::state::State;
use crate::value::Value;

/// Where an input value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    /// Bound by the embedding program.
    Caller,
    /// Taken from the variable's declared default.
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputValue {
    pub value: Value,
    pub source: ValueSource,
}

impl InputValue {
    pub fn from_caller(value: Value) -> Self {
        Self {
            value,
            source: ValueSource::Caller,
        }
    }
}

pub type InputValues = BTreeMap<String, InputValue>;

/// Everything a context is built from.
#[derive(Clone)]
pub struct ContextOpts {
    pub config: Config,
    pub destroy: bool,
    pub state: Arc<State>,
    pub variables: InputValues,
    pub providers: ProviderResolver,
    pub provisioners: BTreeMap<String, ProvisionerFactory>,
}

impl fmt::Debug for ContextOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextOpts")
            .field("destroy", &self.destroy)
            .field("variables", &self.variables.keys().collect::<Vec<_>>())
            .field("providers", &self.providers)
            .field("provisioners", &self.provisioners.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Result of an apply: the state as far as it got, plus what went wrong.
///
/// The state is meaningful even when `diagnostics` has errors.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyOutcome {
    pub state: State,
    pub diagnostics: Diagnostics,
}

/// One orchestration cycle over fixed inputs.
#[async_trait]
pub trait Context: Send {
    fn validate(&self) -> Diagnostics;

    async fn refresh(&mut self) -> Result<State, Diagnostics>;

    async fn plan(&mut self) -> Result<Plan, Diagnostics>;

    async fn apply(&mut self) -> ApplyOutcome;

    /// The context's current working state.
    fn state(&self) -> &State;
}

/// An execution engine.
pub trait Engine: Send + Sync {
    /// Loader for description directories, scoped to `config`.
    fn loader(&self, config: LoaderConfig) -> Box<dyn ConfigLoader>;

    fn new_context(&self, opts: ContextOpts) -> Result<Box<dyn Context>, Diagnostics>;
}
