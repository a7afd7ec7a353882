//! # stratum_platform
//!
//! Drive a declarative infrastructure engine from a host program.
//!
//! A [`Platform`] collects code, variables and provider registrations, then
//! runs validate, refresh, plan and apply cycles against an engine and keeps
//! the resulting state, which can be persisted and restored.
//!
//! ## Example
//!
//! ```rust,no_run
//! use stratum_platform::Platform;
//!
//! # async fn run() -> stratum_platform::PlatformResult<()> {
//! let mut platform = Platform::new(r#"
//! variable "rev" {}
//!
//! resource "null_resource" "server" {
//!   triggers = { rev = var.rev }
//! }
//! "#);
//! platform.bind_vars(&serde_json::json!({ "rev": 1 }))?;
//! platform.apply(false).await?;
//! platform.write_state_to_file("stratum.tfstate")?;
//! # Ok(())
//! # }
//! ```

pub mod binder;
mod builder;
pub mod error;
mod pipeline;
pub mod platform;
pub mod settings;
mod state;

pub use error::{PlatformError, PlatformResult, Stage};
pub use platform::Platform;
pub use settings::{PlatformSettings, DEFAULT_TEMP_PREFIX, LOG_LEVEL_ENV};
