//! Engine log lines reach an installed logger.
//!
//! This binary is the only one that installs a middleware on the process-wide
//! sink, and it does so from a single test.

use std::sync::Arc;

use async_trait::async_trait;
use stratum_engine::{Attributes, Diagnostics, Provisioner, ResourceInstance};
use stratum_log::testing::{Call, RecordingLogger};
use stratum_log::Middleware;
use stratum_platform::Platform;

struct GreetProvisioner;

#[async_trait]
impl Provisioner for GreetProvisioner {
    async fn provision(&self, resource: &ResourceInstance, _config: &Attributes) -> Result<Vec<String>, Diagnostics> {
        Ok(vec![format!("hello from {}", resource.address())])
    }
}

#[tokio::test]
async fn test_engine_output_is_dispatched_to_logger() -> anyhow::Result<()> {
    let mut platform = Platform::new(r#"
resource "null_resource" "greeter" {
  provisioner "greet" {}
}
"#);
    platform.add_provisioner("greet", Arc::new(GreetProvisioner));
    platform.set_log_level("debug");

    let logger = Arc::new(RecordingLogger::default());
    let middleware = Middleware::install(Some(logger.clone()))?;
    platform.apply(false).await?;
    middleware.close();

    let calls = logger.calls();
    assert!(calls
        .iter()
        .any(|call| matches!(call, Call::Info(m) if m == "greet: hello from null_resource.greeter")));
    assert!(calls
        .iter()
        .any(|call| matches!(call, Call::Info(m) if m.starts_with("plan: 1 to add"))));
    Ok(())
}
