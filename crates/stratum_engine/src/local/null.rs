//! The `null` provider.
//!
//! `null_resource` manages nothing. Any change to its arguments replaces it,
//! which shows up as a fresh `id`.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::provider::{provider_factory, Provider, ProviderFactory};
use crate::state::{Attributes, ResourceInstance};
use crate::value::Value;

pub const NULL_PROVIDER: &str = "null";
pub const NULL_RESOURCE: &str = "null_resource";

#[derive(Debug, Clone, Copy, Default)]
pub struct NullProvider;

impl NullProvider {
    pub fn factory() -> ProviderFactory {
        provider_factory(Arc::new(NullProvider))
    }
}

#[async_trait]
impl Provider for NullProvider {
    fn resource_types(&self) -> Vec<String> {
        vec![NULL_RESOURCE.to_string()]
    }

    fn validate_resource(&self, resource_type: &str, attributes: &Attributes) -> Diagnostics {
        let mut diags = Diagnostics::new();
        for (name, value) in attributes {
            match (name.as_str(), value) {
                ("triggers", Value::Null) => {}
                ("triggers", Value::Object(triggers)) => {
                    if let Some((key, _)) = triggers
                        .iter()
                        .find(|(_, v)| matches!(v, Value::List(_) | Value::Object(_)))
                    {
                        diags.push(
                            Diagnostic::error("Invalid triggers")
                                .with_detail(format!("trigger {key:?} must be a primitive value")),
                        );
                    }
                }
                ("triggers", other) => diags.push(
                    Diagnostic::error("Invalid triggers")
                        .with_detail(format!("expected a map, found {}", other.type_name())),
                ),
                (other, _) => diags.push(Diagnostic::error(format!(
                    "Unsupported argument {other:?} for {resource_type}"
                ))),
            }
        }
        diags
    }

    async fn apply_resource(
        &self,
        _resource_type: &str,
        _prior: Option<&Attributes>,
        planned: &Attributes,
    ) -> Result<Attributes, Diagnostics> {
        let mut attributes = planned.clone();
        attributes.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        Ok(attributes)
    }

    async fn destroy_resource(&self, _resource: &ResourceInstance) -> Result<(), Diagnostics> {
        Ok(())
    }
}
