//! The orchestration handle.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::sync::Arc;

use serde::Serialize;
use stratum_engine::{
    provider_factory, provisioner_factory, Engine, LocalEngine, NullProvider, Provider, ProviderFactory, Provisioner,
    ProvisionerFactory, State, Value, NULL_PROVIDER,
};
use stratum_log::{Level, LevelFilter, SharedSink, DEFAULT_LEVEL};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::binder;
use crate::error::PlatformResult;
use crate::settings::PlatformSettings;

/// A managed infrastructure: code, variables, registries and the current
/// state.
///
/// A platform is not safe for concurrent `plan`/`apply` calls; callers own
/// it and serialize access. Every operation builds a fresh execution context
/// from the current inputs.
pub struct Platform {
    pub(crate) code: String,
    pub(crate) providers: BTreeMap<String, ProviderFactory>,
    pub(crate) provisioners: BTreeMap<String, ProvisionerFactory>,
    pub(crate) vars: BTreeMap<String, Value>,
    pub(crate) state: Arc<State>,
    pub(crate) lineage: String,
    pub(crate) serial: u64,
    pub(crate) last_error: Option<String>,
    pub(crate) engine: Arc<dyn Engine>,
    pub(crate) settings: PlatformSettings,
}

impl Platform {
    /// Create a platform with the built-in `null` provider registered.
    pub fn new(code: impl Into<String>) -> Self {
        let mut providers = BTreeMap::new();
        providers.insert(NULL_PROVIDER.to_string(), NullProvider::factory());
        Self {
            code: code.into(),
            providers,
            provisioners: BTreeMap::new(),
            vars: BTreeMap::new(),
            state: Arc::new(State::new()),
            lineage: Uuid::new_v4().to_string(),
            serial: 0,
            last_error: None,
            engine: Arc::new(LocalEngine::new()),
            settings: PlatformSettings::default(),
        }
    }

    /// Drive `engine` instead of the local engine.
    pub fn with_engine(mut self, engine: Arc<dyn Engine>) -> Self {
        self.engine = engine;
        self
    }

    /// Apply `settings`: log level, temporary directory prefix, and the
    /// state file, which is read when it already exists.
    pub fn with_settings(mut self, settings: PlatformSettings) -> PlatformResult<Self> {
        if let Some(level) = settings.log_level.clone() {
            self.set_log_level(&level);
        }
        if let Some(path) = settings.state_path.clone() {
            if path.exists() {
                self.read_state_from_file(&path)?;
            }
        }
        self.settings = settings;
        Ok(self)
    }

    /// Append code. Fragments are joined with a newline.
    pub fn add_code(&mut self, code: &str) -> &mut Self {
        self.code.push('\n');
        self.code.push_str(code);
        self
    }

    pub fn add_provider(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) -> &mut Self {
        self.add_provider_factory(name, provider_factory(provider))
    }

    pub fn add_provider_factory(&mut self, name: impl Into<String>, factory: ProviderFactory) -> &mut Self {
        let name = name.into();
        debug!("Registering provider: {}", name);
        self.providers.insert(name, factory);
        self
    }

    pub fn add_provisioner(&mut self, name: impl Into<String>, provisioner: Arc<dyn Provisioner>) -> &mut Self {
        self.add_provisioner_factory(name, provisioner_factory(provisioner))
    }

    pub fn add_provisioner_factory(&mut self, name: impl Into<String>, factory: ProvisionerFactory) -> &mut Self {
        let name = name.into();
        debug!("Registering provisioner: {}", name);
        self.provisioners.insert(name, factory);
        self
    }

    /// Replace the bound variables with the fields of `vars`.
    ///
    /// On failure the error is also recorded as the last error and the
    /// previously bound variables are kept.
    pub fn bind_vars<T: Serialize + ?Sized>(&mut self, vars: &T) -> PlatformResult<&mut Self> {
        match binder::bind(vars) {
            Ok(bound) => {
                self.vars = bound;
                Ok(self)
            }
            Err(e) => {
                self.last_error = Some(format!("last error: {e}"));
                Err(e)
            }
        }
    }

    /// Filter the process-wide engine log to `level` and above, written to
    /// stdout. Unknown levels fall back to `INFO`.
    pub fn set_log_level(&mut self, level: &str) -> &mut Self {
        let level = level.parse::<Level>().unwrap_or(DEFAULT_LEVEL);
        let sink = SharedSink::global();
        if sink.is_intercepted() {
            warn!("Log sink is intercepted, not installing a {} level filter", level);
        } else {
            sink.set_output(Box::new(LevelFilter::new(level, io::stdout())));
        }
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn vars(&self) -> &BTreeMap<String, Value> {
        &self.vars
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Shared handle on the current state.
    pub fn state_arc(&self) -> Arc<State> {
        Arc::clone(&self.state)
    }

    pub fn lineage(&self) -> &str {
        &self.lineage
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn settings(&self) -> &PlatformSettings {
        &self.settings
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    pub(crate) fn replace_state(&mut self, state: State) {
        if state != *self.state {
            self.serial += 1;
        }
        self.state = Arc::new(state);
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::new("")
    }
}

impl fmt::Debug for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Platform")
            .field("code_len", &self.code.len())
            .field("providers", &self.provider_names())
            .field("provisioners", &self.provisioners.keys().collect::<Vec<_>>())
            .field("vars", &self.vars)
            .field("resources", &self.state.resources.len())
            .field("serial", &self.serial)
            .field("last_error", &self.last_error)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_registers_null_provider() {
        let platform = Platform::new("");

        assert_eq!(platform.provider_names(), vec![NULL_PROVIDER]);
        assert!(platform.state().is_empty());
        assert_eq!(platform.serial(), 0);
        assert!(!platform.lineage().is_empty());
    }

    #[test]
    fn test_add_code_appends() {
        let mut platform = Platform::new("variable \"a\" {}");
        platform.add_code("variable \"b\" {}");

        assert_eq!(platform.code(), "variable \"a\" {}\nvariable \"b\" {}");
    }

    #[test]
    fn test_failed_binding_keeps_previous_vars() {
        let mut platform = Platform::new("");
        platform.bind_vars(&json!({ "region": "eu" })).unwrap();

        let result = platform.bind_vars(&json!({ "ports": [1, "two"] }));

        assert!(result.is_err());
        assert_eq!(platform.vars()["region"], Value::from("eu"));
        assert!(platform.last_error().unwrap().starts_with("last error: failed to bind variables"));
    }

    #[test]
    fn test_replace_state_bumps_serial_on_change() {
        let mut platform = Platform::new("");
        platform.replace_state(State::new());
        assert_eq!(platform.serial(), 0);

        let mut state = State::new();
        state.outputs.insert("x".into(), Value::from("y"));
        platform.replace_state(state);
        assert_eq!(platform.serial(), 1);
    }
}
