//! Configuration loading.
//!
//! A [`ConfigLoader`] turns a directory of description files into a
//! [`Config`]. The stock [`Loader`] reads every `*.tf` file in the directory
//! in name order and merges them into one root module.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::{Config, Expr, OutputConfig, ProviderConfig, ProvisionerConfig, ResourceConfig, VariableDecl};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::parser::{self, Attribute, Block, Body};
use crate::value::Value;

/// Extension of description files picked up by [`Loader`].
pub const CONFIG_EXTENSION: &str = "tf";

/// Settings for a loader instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Where installed child modules would live.
    pub modules_dir: PathBuf,
}

/// Loads and validates a root module from a directory.
pub trait ConfigLoader: Send + Sync {
    fn load_config(&self, dir: &Path) -> Result<Config, Diagnostics>;
}

/// The stock loader.
#[derive(Debug, Clone)]
pub struct Loader {
    config: LoaderConfig,
}

impl Loader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub fn modules_dir(&self) -> &Path {
        &self.config.modules_dir
    }

    /// Load a single in-memory source as a root module.
    pub fn load_source(&self, file: &str, source: &str) -> Result<Config, Diagnostics> {
        let mut builder = ConfigBuilder::new(&self.config);
        builder.add_file(file, source);
        builder.finish()
    }
}

impl ConfigLoader for Loader {
    fn load_config(&self, dir: &Path) -> Result<Config, Diagnostics> {
        let read_error = |e: std::io::Error| -> Diagnostics {
            Diagnostic::error("Failed to read configuration directory")
                .with_subject(dir.display().to_string())
                .with_detail(e.to_string())
                .into()
        };

        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(read_error)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == CONFIG_EXTENSION))
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(Diagnostic::error("No configuration files")
                .with_subject(dir.display().to_string())
                .with_detail(format!("the directory contains no .{CONFIG_EXTENSION} files"))
                .into());
        }

        let mut builder = ConfigBuilder::new(&self.config);
        for path in &files {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            let source = fs::read_to_string(path).map_err(read_error)?;
            debug!("Loading configuration file {}", name);
            builder.add_file(&name, &source);
        }
        builder.finish()
    }
}

struct ConfigBuilder<'a> {
    loader: &'a LoaderConfig,
    config: Config,
    diags: Diagnostics,
}

impl<'a> ConfigBuilder<'a> {
    fn new(loader: &'a LoaderConfig) -> Self {
        Self {
            loader,
            config: Config::default(),
            diags: Diagnostics::new(),
        }
    }

    fn finish(self) -> Result<Config, Diagnostics> {
        self.diags.into_result(self.config)
    }

    fn report(&mut self, file: &str, block: &Block, diagnostic: Diagnostic) {
        self.diags
            .push(diagnostic.with_subject(format!("{file}:{}:{}", block.pos.line, block.pos.col)));
    }

    fn error(&mut self, file: &str, block: &Block, summary: impl Into<String>) {
        self.report(file, block, Diagnostic::error(summary));
    }

    fn add_file(&mut self, file: &str, source: &str) {
        let body = match parser::parse(file, source) {
            Ok(body) => body,
            Err(diag) => {
                self.diags.push(diag);
                return;
            }
        };

        for attribute in &body.attributes {
            self.diags.push(
                Diagnostic::error(format!("Unexpected attribute {:?}", attribute.name))
                    .with_subject(format!("{file}:{}:{}", attribute.pos.line, attribute.pos.col))
                    .with_detail("attributes are only allowed inside blocks"),
            );
        }

        for block in &body.blocks {
            match block.kind.as_str() {
                "variable" => self.add_variable(file, block),
                "provider" => self.add_provider(file, block),
                "resource" => self.add_resource(file, block),
                "output" => self.add_output(file, block),
                "module" => {
                    let detail = format!(
                        "module {:?} would need installing into {}",
                        block.labels.first().cloned().unwrap_or_default(),
                        self.loader.modules_dir.display()
                    );
                    self.report(file, block, Diagnostic::error("Modules are not supported").with_detail(detail));
                }
                other => {
                    let summary = format!("Unsupported block type {other:?}");
                    self.error(file, block, summary);
                }
            }
        }
    }

    fn expect_labels(&mut self, file: &str, block: &Block, count: usize) -> bool {
        if block.labels.len() == count {
            return true;
        }
        let summary = format!(
            "A {} block expects {count} label(s), found {}",
            block.kind,
            block.labels.len()
        );
        self.error(file, block, summary);
        false
    }

    fn add_variable(&mut self, file: &str, block: &Block) {
        if !self.expect_labels(file, block, 1) {
            return;
        }
        let name = block.labels[0].clone();
        if self.config.variables.contains_key(&name) {
            self.error(file, block, format!("Duplicate variable declaration {name:?}"));
            return;
        }

        let mut decl = VariableDecl {
            name: name.clone(),
            default: None,
            description: None,
        };
        for attribute in &block.body.attributes {
            match (attribute.name.as_str(), &attribute.expr) {
                ("default", expr) => match constant(expr) {
                    Some(value) => decl.default = Some(value),
                    None => {
                        let diagnostic = Diagnostic::error("Variables not allowed here")
                            .with_detail(format!("the default of variable {name:?} must be a constant"));
                        self.report(file, block, diagnostic);
                    }
                },
                ("description", Expr::Literal(Value::String(text))) => {
                    decl.description = Some(text.clone());
                }
                ("type" | "sensitive" | "nullable", _) => {}
                (other, _) => {
                    let summary = format!("Unsupported argument {other:?} in variable {name:?}");
                    self.error(file, block, summary);
                }
            }
        }
        self.config.variables.insert(name, decl);
    }

    fn add_provider(&mut self, file: &str, block: &Block) {
        if !self.expect_labels(file, block, 1) {
            return;
        }
        let name = block.labels[0].clone();
        if self.config.providers.contains_key(&name) {
            self.error(file, block, format!("Duplicate provider configuration {name:?}"));
            return;
        }
        let attributes = self.attributes(file, block, &block.body);
        self.config.providers.insert(name.clone(), ProviderConfig { name, attributes });
    }

    fn add_resource(&mut self, file: &str, block: &Block) {
        if !self.expect_labels(file, block, 2) {
            return;
        }
        let resource = ResourceConfig {
            resource_type: block.labels[0].clone(),
            name: block.labels[1].clone(),
            attributes: self.attributes(file, block, &block.body),
            provisioners: Vec::new(),
        };
        let address = resource.address();
        if self.config.resource(&address).is_some() {
            self.error(file, block, format!("Duplicate resource {address:?}"));
            return;
        }

        let mut provisioners = Vec::new();
        for nested in &block.body.blocks {
            if nested.kind != "provisioner" {
                let summary = format!("Unsupported block type {:?} in {address}", nested.kind);
                self.error(file, nested, summary);
                continue;
            }
            if !self.expect_labels(file, nested, 1) {
                continue;
            }
            provisioners.push(ProvisionerConfig {
                kind: nested.labels[0].clone(),
                attributes: self.attributes(file, nested, &nested.body),
            });
        }

        self.config.resources.push(ResourceConfig {
            provisioners,
            ..resource
        });
    }

    fn add_output(&mut self, file: &str, block: &Block) {
        if !self.expect_labels(file, block, 1) {
            return;
        }
        let name = block.labels[0].clone();
        let value = block
            .body
            .attributes
            .iter()
            .find(|a| a.name == "value")
            .map(|a| a.expr.clone());
        match value {
            Some(value) => {
                self.config.outputs.insert(name.clone(), OutputConfig { name, value });
            }
            None => {
                self.error(file, block, format!("Output {name:?} has no value"));
            }
        }
    }

    fn attributes(&mut self, file: &str, block: &Block, body: &Body) -> BTreeMap<String, Expr> {
        let mut attributes = BTreeMap::new();
        for Attribute { name, expr, .. } in &body.attributes {
            if attributes.insert(name.clone(), expr.clone()).is_some() {
                self.error(file, block, format!("Attribute {name:?} set more than once"));
            }
        }
        attributes
    }
}

/// Evaluate an expression that may not reference anything.
fn constant(expr: &Expr) -> Option<Value> {
    match expr {
        Expr::Literal(value) => Some(value.clone()),
        Expr::List(items) => items.iter().map(constant).collect::<Option<_>>().map(Value::List),
        Expr::Object(fields) => fields
            .iter()
            .map(|(k, v)| constant(v).map(|v| (k.clone(), v)))
            .collect::<Option<_>>()
            .map(Value::Object),
        Expr::Variable(_) | Expr::ResourceAttribute { .. } | Expr::Template(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn loader(dir: &Path) -> Loader {
        Loader::new(LoaderConfig {
            modules_dir: dir.join("modules"),
        })
    }

    #[test]
    fn test_load_merges_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("vars.tf"), "variable \"region\" { default = \"eu\" }").unwrap();
        fs::write(
            dir.path().join("main.tf"),
            "resource \"null_resource\" \"a\" { triggers = { r = var.region } }\noutput \"id\" { value = null_resource.a.id }",
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "not configuration").unwrap();

        let config = loader(dir.path()).load_config(dir.path()).unwrap();

        assert_eq!(config.variables["region"].default, Some(Value::from("eu")));
        assert_eq!(config.resources.len(), 1);
        assert_eq!(config.resources[0].address(), "null_resource.a");
        assert!(config.outputs.contains_key("id"));
        assert_eq!(config.required_providers(), vec!["null"]);
    }

    #[test]
    fn test_load_empty_dir() {
        let dir = tempdir().unwrap();

        let diags = loader(dir.path()).load_config(dir.path()).unwrap_err();

        assert!(diags.to_string().contains("No configuration files"));
    }

    #[test]
    fn test_module_block_names_modules_dir() {
        let dir = tempdir().unwrap();
        let loader = loader(dir.path());

        let diags = loader
            .load_source("main.tf", "module \"net\" { source = \"./net\" }")
            .unwrap_err();

        let message = diags.to_string();
        assert!(message.contains("Modules are not supported"));
        assert!(message.contains(&loader.modules_dir().display().to_string()));
    }

    #[test]
    fn test_collects_every_problem() {
        let dir = tempdir().unwrap();
        let source = r#"
            stray = 1
            variable "a" {}
            variable "a" {}
            variable "b" { default = var.a }
            data "x" "y" {}
        "#;

        let diags = loader(dir.path()).load_source("main.tf", source).unwrap_err();

        assert_eq!(diags.errors().count(), 4);
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let dir = tempdir().unwrap();

        let diags = loader(dir.path()).load_source("main.tf", "resource {").unwrap_err();

        assert!(diags.has_errors());
        assert!(diags.iter().next().unwrap().subject.as_deref().unwrap().starts_with("main.tf:"));
    }
}
