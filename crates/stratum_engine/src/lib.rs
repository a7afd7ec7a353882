//! # stratum_engine
//!
//! The execution engine contract stratum drives, and a local reference
//! engine implementing it.
//!
//! An [`Engine`] hands out a [`ConfigLoader`] for description directories
//! and builds a [`Context`] from a loaded [`Config`], input values, prior
//! [`State`] and provider factories. The context then validates, refreshes,
//! plans and applies.
//!
//! [`LocalEngine`] reads a small HCL-like `.tf` dialect and runs everything
//! in-process, shipping with the `null` provider.

pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod hook;
pub mod loader;
pub mod local;
pub mod parser;
pub mod plan;
pub mod provider;
pub mod state;
pub mod statefile;
pub mod value;

pub use config::{Config, Expr, OutputConfig, ProviderConfig, ProvisionerConfig, ResourceConfig, VariableDecl};
pub use context::{ApplyOutcome, Context, ContextOpts, Engine, InputValue, InputValues, ValueSource};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{EngineError, EngineResult, StateFileError, ValueError};
pub use hook::{Hook, HookAction, LogHook};
pub use loader::{ConfigLoader, Loader, LoaderConfig, CONFIG_EXTENSION};
pub use local::{LocalContext, LocalEngine, NullProvider, NULL_PROVIDER, NULL_RESOURCE};
pub use plan::{Action, Plan, ResourceChange};
pub use provider::{provider_factory, provisioner_factory, Provider, ProviderFactory, ProviderResolver, Provisioner, ProvisionerFactory};
pub use state::{Attributes, ResourceInstance, State};
pub use statefile::{StateFile, FORMAT_VERSION};
pub use value::{implied_type, Value, ValueType};
