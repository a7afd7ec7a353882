//! Provider and provisioner contracts.
//!
//! Registries map a name to a factory: a zero-argument constructor returning
//! a ready-to-use instance or an error.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::EngineResult;
use crate::state::{Attributes, ResourceInstance};

/// Manages the lifecycle of one family of resource types.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Resource type names this provider manages.
    fn resource_types(&self) -> Vec<String>;

    /// Check evaluated resource arguments before any change is planned.
    fn validate_resource(&self, resource_type: &str, attributes: &Attributes) -> Diagnostics {
        let _ = (resource_type, attributes);
        Diagnostics::new()
    }

    /// Attributes the provider fills in itself. A prior value for one of
    /// these never counts as drift when the configuration leaves it out.
    fn computed_attributes(&self, resource_type: &str) -> Vec<String> {
        let _ = resource_type;
        vec!["id".to_string()]
    }

    /// Receive the evaluated `provider` block, if any.
    async fn configure(&self, config: &Attributes) -> Result<(), Diagnostics> {
        let _ = config;
        Ok(())
    }

    /// Re-read a managed resource. `None` means it no longer exists.
    async fn read_resource(&self, resource: &ResourceInstance) -> Result<Option<Attributes>, Diagnostics> {
        Ok(Some(resource.attributes.clone()))
    }

    /// Create (`prior` is `None`) or update a resource, returning its full
    /// attribute set including computed attributes.
    async fn apply_resource(
        &self,
        resource_type: &str,
        prior: Option<&Attributes>,
        planned: &Attributes,
    ) -> Result<Attributes, Diagnostics>;

    async fn destroy_resource(&self, resource: &ResourceInstance) -> Result<(), Diagnostics>;
}

/// Runs a side-effecting action against a freshly created resource.
#[async_trait]
pub trait Provisioner: Send + Sync {
    fn validate(&self, config: &Attributes) -> Diagnostics {
        let _ = config;
        Diagnostics::new()
    }

    /// Run the provisioner. Returned lines are reported as provisioner output.
    async fn provision(&self, resource: &ResourceInstance, config: &Attributes) -> Result<Vec<String>, Diagnostics>;
}

pub type ProviderFactory = Arc<dyn Fn() -> EngineResult<Arc<dyn Provider>> + Send + Sync>;
pub type ProvisionerFactory = Arc<dyn Fn() -> EngineResult<Arc<dyn Provisioner>> + Send + Sync>;

/// Factory always handing out the same provider instance.
pub fn provider_factory(provider: Arc<dyn Provider>) -> ProviderFactory {
    Arc::new(move || Ok(provider.clone()))
}

/// Factory always handing out the same provisioner instance.
pub fn provisioner_factory(provisioner: Arc<dyn Provisioner>) -> ProvisionerFactory {
    Arc::new(move || Ok(provisioner.clone()))
}

/// Fixed name-to-factory lookup handed to a context.
#[derive(Clone, Default)]
pub struct ProviderResolver {
    factories: BTreeMap<String, ProviderFactory>,
}

impl ProviderResolver {
    pub fn fixed(factories: BTreeMap<String, ProviderFactory>) -> Self {
        Self { factories }
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Instantiate every named provider, collecting one diagnostic per
    /// missing or failing provider.
    pub fn resolve(&self, names: &[String]) -> Result<BTreeMap<String, Arc<dyn Provider>>, Diagnostics> {
        let mut providers = BTreeMap::new();
        let mut diags = Diagnostics::new();
        for name in names {
            match self.factories.get(name) {
                Some(factory) => match factory() {
                    Ok(provider) => {
                        providers.insert(name.clone(), provider);
                    }
                    Err(e) => diags.push(
                        Diagnostic::error(format!("Failed to instantiate provider {name:?}"))
                            .with_detail(e.to_string()),
                    ),
                },
                None => diags.push(
                    Diagnostic::error(format!("Provider {name:?} is not available"))
                        .with_detail(format!("registered providers: {}", self.names().join(", "))),
                ),
            }
        }
        diags.into_result(providers)
    }
}

impl fmt::Debug for ProviderResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderResolver")
            .field("providers", &self.names())
            .finish()
    }
}
