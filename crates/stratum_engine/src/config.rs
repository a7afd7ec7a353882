//! Loaded infrastructure configuration.

use std::collections::BTreeMap;

use crate::value::Value;

/// Part of an interpolated string.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Text(String),
    Variable(String),
}

/// An unevaluated attribute expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// `var.NAME`
    Variable(String),
    /// `TYPE.NAME.ATTRIBUTE`
    ResourceAttribute { address: String, attribute: String },
    Template(Vec<TemplatePart>),
    List(Vec<Expr>),
    Object(BTreeMap<String, Expr>),
}

impl Expr {
    /// Names of every input variable referenced by this expression.
    pub fn variable_refs(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        self.collect_variable_refs(&mut refs);
        refs
    }

    fn collect_variable_refs<'a>(&'a self, refs: &mut Vec<&'a str>) {
        match self {
            Expr::Literal(_) | Expr::ResourceAttribute { .. } => {}
            Expr::Variable(name) => refs.push(name),
            Expr::Template(parts) => refs.extend(parts.iter().filter_map(|part| match part {
                TemplatePart::Variable(name) => Some(name.as_str()),
                TemplatePart::Text(_) => None,
            })),
            Expr::List(items) => items.iter().for_each(|item| item.collect_variable_refs(refs)),
            Expr::Object(fields) => fields.values().for_each(|field| field.collect_variable_refs(refs)),
        }
    }

    /// Whether the expression reads resource attributes anywhere.
    pub fn has_resource_refs(&self) -> bool {
        match self {
            Expr::ResourceAttribute { .. } => true,
            Expr::Literal(_) | Expr::Variable(_) | Expr::Template(_) => false,
            Expr::List(items) => items.iter().any(Expr::has_resource_refs),
            Expr::Object(fields) => fields.values().any(Expr::has_resource_refs),
        }
    }
}

/// A `variable "NAME" {}` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    pub name: String,
    pub default: Option<Value>,
    pub description: Option<String>,
}

/// A `provider "NAME" {}` block.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub name: String,
    pub attributes: BTreeMap<String, Expr>,
}

/// A `provisioner "KIND" {}` block nested in a resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionerConfig {
    pub kind: String,
    pub attributes: BTreeMap<String, Expr>,
}

/// A `resource "TYPE" "NAME" {}` block.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceConfig {
    pub resource_type: String,
    pub name: String,
    pub attributes: BTreeMap<String, Expr>,
    pub provisioners: Vec<ProvisionerConfig>,
}

impl ResourceConfig {
    pub fn address(&self) -> String {
        format!("{}.{}", self.resource_type, self.name)
    }

    /// Provider owning this resource type: the type name up to the first `_`.
    pub fn provider_name(&self) -> &str {
        provider_for_type(&self.resource_type)
    }
}

/// Provider name implied by a resource type name.
pub fn provider_for_type(resource_type: &str) -> &str {
    resource_type.split('_').next().unwrap_or(resource_type)
}

/// An `output "NAME" {}` block.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfig {
    pub name: String,
    pub value: Expr,
}

/// A fully loaded root module.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub variables: BTreeMap<String, VariableDecl>,
    pub providers: BTreeMap<String, ProviderConfig>,
    pub resources: Vec<ResourceConfig>,
    pub outputs: BTreeMap<String, OutputConfig>,
}

impl Config {
    pub fn is_declared(&self, variable: &str) -> bool {
        self.variables.contains_key(variable)
    }

    pub fn resource(&self, address: &str) -> Option<&ResourceConfig> {
        self.resources.iter().find(|r| r.address() == address)
    }

    /// Provider names needed by the declared resources, deduplicated.
    pub fn required_providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .resources
            .iter()
            .map(|r| r.provider_name().to_string())
            .chain(self.providers.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_for_type() {
        assert_eq!(provider_for_type("null_resource"), "null");
        assert_eq!(provider_for_type("aws_s3_bucket"), "aws");
        assert_eq!(provider_for_type("plain"), "plain");
    }

    #[test]
    fn test_variable_refs() {
        let expr = Expr::Object(
            [
                ("a".to_string(), Expr::Variable("region".into())),
                (
                    "b".to_string(),
                    Expr::Template(vec![
                        TemplatePart::Text("x-".into()),
                        TemplatePart::Variable("zone".into()),
                    ]),
                ),
            ]
            .into(),
        );

        assert_eq!(expr.variable_refs(), vec!["region", "zone"]);
        assert!(!expr.has_resource_refs());
    }
}
