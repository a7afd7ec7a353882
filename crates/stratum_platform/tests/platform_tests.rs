//! Orchestration tests against the local engine.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::json;
use stratum_engine::{Action, Attributes, Diagnostic, Diagnostics, Provider, ResourceInstance, Value};
use stratum_platform::{Platform, PlatformError, PlatformSettings, Stage};

const NULL_CODE: &str = r#"
variable "rev" {
  default = 1
}

resource "null_resource" "server" {
  triggers = {
    rev = var.rev
  }
}

output "server_id" {
  value = null_resource.server.id
}
"#;

/// `flaky_thing` resources fail to apply once `broken` is set.
#[derive(Default)]
struct FlakyProvider {
    broken: Mutex<bool>,
}

#[async_trait]
impl Provider for FlakyProvider {
    fn resource_types(&self) -> Vec<String> {
        vec!["flaky_thing".to_string()]
    }

    async fn apply_resource(
        &self,
        _resource_type: &str,
        _prior: Option<&Attributes>,
        planned: &Attributes,
    ) -> Result<Attributes, Diagnostics> {
        if *self.broken.lock() {
            return Err(Diagnostic::error("flaky backend is down").into());
        }
        let mut attributes = planned.clone();
        attributes.insert("id".to_string(), Value::from("flaky-1"));
        Ok(attributes)
    }

    async fn destroy_resource(&self, _resource: &ResourceInstance) -> Result<(), Diagnostics> {
        Ok(())
    }
}

#[tokio::test]
async fn test_empty_code_is_rejected() {
    let platform = Platform::new("");

    let err = platform.plan(false).await.unwrap_err();

    assert!(matches!(err, PlatformError::NoCode));
}

#[tokio::test]
async fn test_undeclared_variable_fails_build() {
    let mut platform = Platform::new(r#"variable "region" {}"#);
    platform.bind_vars(&json!({ "zone": "us" })).unwrap();

    let err = platform.plan(false).await.unwrap_err();

    match err {
        PlatformError::UndeclaredVariable(name) => assert_eq!(name, "zone"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_invalid_code_reports_load_error() {
    let platform = Platform::new("resource \"null_resource\" {");

    let err = platform.validate().unwrap_err();

    assert!(matches!(err, PlatformError::ConfigLoad(_)));
    assert!(err.to_string().starts_with("failed to load the configuration. "));
    assert!(err.diagnostics().is_some_and(Diagnostics::has_errors));
}

#[tokio::test]
async fn test_missing_required_variable_fails_validation() {
    let platform = Platform::new(r#"
variable "name" {}

resource "null_resource" "a" {
  triggers = { name = var.name }
}
"#);

    let err = platform.validate().unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Validate));
}

#[tokio::test]
async fn test_plan_does_not_touch_state() -> anyhow::Result<()> {
    let platform = Platform::new(NULL_CODE);

    let plan = platform.plan(false).await?;

    assert_eq!(plan.count(Action::Create), 1);
    assert!(platform.state().is_empty());
    assert_eq!(platform.serial(), 0);
    Ok(())
}

#[tokio::test]
async fn test_apply_converges() -> anyhow::Result<()> {
    let mut platform = Platform::new(NULL_CODE);

    platform.apply(false).await?;
    let id = platform.state().resource("null_resource.server").and_then(|r| r.id()).map(str::to_string);

    assert!(id.is_some());
    assert_eq!(platform.state().outputs["server_id"].as_str(), id.as_deref());
    assert_eq!(platform.serial(), 1);
    assert!(platform.plan(false).await?.is_noop());

    platform.apply(false).await?;
    assert_eq!(platform.serial(), 1);
    Ok(())
}

#[tokio::test]
async fn test_changed_trigger_replaces_id() -> anyhow::Result<()> {
    #[derive(Serialize)]
    struct Vars {
        rev: u32,
    }

    let mut platform = Platform::new(NULL_CODE);
    platform.apply(false).await?;
    let before = platform.state().outputs["server_id"].clone();

    platform.bind_vars(&Vars { rev: 2 })?;
    let plan = platform.plan(false).await?;
    assert_eq!(plan.count(Action::Update), 1);
    platform.apply(false).await?;

    assert_ne!(platform.state().outputs["server_id"], before);
    Ok(())
}

#[tokio::test]
async fn test_destroy_empties_state() -> anyhow::Result<()> {
    let mut platform = Platform::new(NULL_CODE);
    platform.apply(false).await?;

    platform.apply(true).await?;

    assert!(platform.state().is_empty());
    assert!(platform.state().outputs.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_failed_apply_commits_partial_state() {
    let provider = Arc::new(FlakyProvider::default());
    let mut platform = Platform::new(r#"
resource "null_resource" "a" {
  triggers = { size = 1 }
}
"#);
    platform.add_code(r#"
resource "flaky_thing" "z" {
  size = 1
}
"#);
    platform.add_provider("flaky", provider.clone());
    *provider.broken.lock() = true;

    let err = platform.apply(false).await.unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Apply));
    assert!(err.to_string().contains("flaky backend is down"));
    assert!(platform.state().resource("null_resource.a").is_some());
    assert!(platform.state().resource("flaky_thing.z").is_none());
    assert_eq!(platform.serial(), 1);

    *provider.broken.lock() = false;
    platform.apply(false).await.unwrap();
    assert!(platform.state().resource("flaky_thing.z").is_some());
}

#[tokio::test]
async fn test_apply_error_wins_over_state_write_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let settings = PlatformSettings {
        state_path: Some(dir.path().join("missing-dir").join("s.tfstate")),
        ..PlatformSettings::default()
    };
    let provider = Arc::new(FlakyProvider::default());
    *provider.broken.lock() = true;
    let mut platform = Platform::new(r#"
resource "flaky_thing" "z" {
  size = 1
}
"#)
    .with_settings(settings)?;
    platform.add_provider("flaky", provider);

    let err = platform.apply(false).await.unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Apply));
    assert!(err.to_string().contains("flaky backend is down"));
    Ok(())
}

#[tokio::test]
async fn test_state_write_error_surfaces_after_successful_apply() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let settings = PlatformSettings {
        state_path: Some(dir.path().join("missing-dir").join("s.tfstate")),
        ..PlatformSettings::default()
    };
    let mut platform = Platform::new(NULL_CODE).with_settings(settings)?;

    let err = platform.apply(false).await.unwrap_err();

    assert!(matches!(err, PlatformError::Io(_)));
    assert!(platform.state().resource("null_resource.server").is_some());
    Ok(())
}

#[tokio::test]
async fn test_unregistered_provider_fails_build() {
    let platform = Platform::new(r#"
resource "cloud_bucket" "logs" {
  name = "logs"
}
"#);

    let err = platform.plan(false).await.unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Context));
}

#[tokio::test]
async fn test_temporary_directory_is_removed() -> anyhow::Result<()> {
    let prefix = format!(".stratum-test-{}", uuid::Uuid::new_v4().simple());
    let settings = PlatformSettings {
        temp_prefix: prefix.clone(),
        ..PlatformSettings::default()
    };
    let platform = Platform::new(NULL_CODE).with_settings(settings)?;
    let broken = Platform::new("resource {").with_settings(platform.settings().clone())?;

    platform.plan(false).await?;
    assert!(broken.validate().is_err());

    let leftovers = std::fs::read_dir(std::env::temp_dir())?
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(&prefix))
        .count();
    assert_eq!(leftovers, 0);
    Ok(())
}

#[tokio::test]
async fn test_state_file_setting_persists_applies() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let settings = PlatformSettings {
        state_path: Some(dir.path().join("stratum.tfstate")),
        ..PlatformSettings::default()
    };

    let mut first = Platform::new(NULL_CODE).with_settings(settings.clone())?;
    first.apply(false).await?;
    let second = Platform::new(NULL_CODE).with_settings(settings)?;

    assert_eq!(second.state(), first.state());
    assert_eq!(second.lineage(), first.lineage());
    assert_eq!(second.serial(), first.serial());
    assert!(second.plan(false).await?.is_noop());
    Ok(())
}
