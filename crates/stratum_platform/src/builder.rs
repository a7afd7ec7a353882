//! Execution context construction.
//!
//! Code is written to a temporary directory that only lives for the
//! duration of the load; the engine's loader never sees the handle itself.

use std::fs;

use stratum_engine::{Config, Context, ContextOpts, InputValue, InputValues, LoaderConfig, ProviderResolver};
use tracing::{debug, info};

use crate::error::{PlatformError, PlatformResult, Stage};
use crate::platform::Platform;

const MAIN_FILE: &str = "main.tf";
const MODULES_DIR: &str = "modules";

impl Platform {
    /// Build a validated execution context from the current inputs.
    pub(crate) fn new_context(&self, destroy: bool) -> PlatformResult<Box<dyn Context>> {
        let config = self.load_config()?;
        let variables = self.input_values(&config)?;

        let opts = ContextOpts {
            config,
            destroy,
            state: self.state_arc(),
            variables,
            providers: ProviderResolver::fixed(self.providers.clone()),
            provisioners: self.provisioners.clone(),
        };
        debug!("Creating context: {:?}", opts);
        let context = self
            .engine
            .new_context(opts)
            .map_err(|d| PlatformError::engine(Stage::Context, d))?;

        let diagnostics = context.validate();
        if diagnostics.has_errors() {
            return Err(PlatformError::engine(Stage::Validate, diagnostics));
        }
        for warning in diagnostics.warnings() {
            info!("Validation warning: {}", warning);
        }
        Ok(context)
    }

    fn load_config(&self) -> PlatformResult<Config> {
        if self.code.trim().is_empty() {
            return Err(PlatformError::NoCode);
        }

        let dir = tempfile::Builder::new()
            .prefix(&self.settings.temp_prefix)
            .tempdir()?;
        fs::write(dir.path().join(MAIN_FILE), &self.code)?;

        let loader = self.engine.loader(LoaderConfig {
            modules_dir: dir.path().join(MODULES_DIR),
        });
        let config = loader.load_config(dir.path()).map_err(PlatformError::ConfigLoad)?;
        debug!(
            "Loaded configuration: {} variable(s), {} resource(s)",
            config.variables.len(),
            config.resources.len()
        );
        Ok(config)
    }

    /// Bound variables as caller-sourced inputs. Every name must be declared.
    fn input_values(&self, config: &Config) -> PlatformResult<InputValues> {
        let mut values = InputValues::new();
        for (name, value) in &self.vars {
            if !config.is_declared(name) {
                return Err(PlatformError::UndeclaredVariable(name.clone()));
            }
            values.insert(name.clone(), InputValue::from_caller(value.clone()));
        }
        Ok(values)
    }
}
