//! Resource state snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Attribute map of a resource.
pub type Attributes = BTreeMap<String, Value>;

/// One managed resource instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceInstance {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    pub provider: String,
    #[serde(default)]
    pub attributes: Attributes,
}

impl ResourceInstance {
    pub fn new(
        resource_type: impl Into<String>,
        name: impl Into<String>,
        provider: impl Into<String>,
        attributes: Attributes,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            provider: provider.into(),
            attributes,
        }
    }

    /// `TYPE.NAME`
    pub fn address(&self) -> String {
        format!("{}.{}", self.resource_type, self.name)
    }

    pub fn id(&self) -> Option<&str> {
        self.attributes.get("id").and_then(Value::as_str)
    }
}

/// Every resource currently under management, plus root outputs.
///
/// Snapshots are replaced wholesale by the orchestration layer, never edited
/// in place while shared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceInstance>,
    #[serde(default)]
    pub outputs: BTreeMap<String, Value>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.outputs.is_empty()
    }

    pub fn resource(&self, address: &str) -> Option<&ResourceInstance> {
        self.resources.get(address)
    }

    pub fn set_resource(&mut self, instance: ResourceInstance) {
        self.resources.insert(instance.address(), instance);
    }

    pub fn remove_resource(&mut self, address: &str) -> Option<ResourceInstance> {
        self.resources.remove(address)
    }

    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_remove_resource() {
        let mut state = State::new();
        let mut attributes = Attributes::new();
        attributes.insert("id".into(), Value::from("abc"));

        state.set_resource(ResourceInstance::new("null_resource", "a", "null", attributes));

        let instance = state.resource("null_resource.a").unwrap();
        assert_eq!(instance.id(), Some("abc"));
        assert_eq!(state.addresses().collect::<Vec<_>>(), vec!["null_resource.a"]);

        assert!(state.remove_resource("null_resource.a").is_some());
        assert!(state.is_empty());
    }
}
