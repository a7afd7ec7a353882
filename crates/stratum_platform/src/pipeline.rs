//! Orchestration: build, refresh, plan, apply.
//!
//! Each call is terminal on the first failing stage and nothing is retried.

use stratum_engine::Plan;
use tracing::{info, warn};

use crate::error::{PlatformError, PlatformResult, Stage};
use crate::platform::Platform;

impl Platform {
    /// Check the code and variables without touching any resource.
    pub fn validate(&self) -> PlatformResult<()> {
        self.new_context(false).map(|_| ())
    }

    /// Re-read every managed resource and replace the state with the result.
    pub async fn refresh(&mut self) -> PlatformResult<()> {
        let mut context = self.new_context(false)?;
        let state = context
            .refresh()
            .await
            .map_err(|d| PlatformError::engine(Stage::Refresh, d))?;
        self.replace_state(state);
        Ok(())
    }

    /// Compute what `apply(destroy)` would change. The state is left as is.
    pub async fn plan(&self, destroy: bool) -> PlatformResult<Plan> {
        let mut context = self.new_context(destroy)?;
        context
            .refresh()
            .await
            .map_err(|d| PlatformError::engine(Stage::Refresh, d))?;
        let plan = context
            .plan()
            .await
            .map_err(|d| PlatformError::engine(Stage::Plan, d))?;
        info!("Plan: {}", plan.summary());
        Ok(plan)
    }

    /// Bring the infrastructure to the state the code describes, or destroy
    /// it when `destroy` is set.
    ///
    /// Whatever state the engine reaches replaces the current one, even when
    /// the apply fails part way.
    pub async fn apply(&mut self, destroy: bool) -> PlatformResult<()> {
        let mut context = self.new_context(destroy)?;
        context
            .refresh()
            .await
            .map_err(|d| PlatformError::engine(Stage::Refresh, d))?;
        let plan = context
            .plan()
            .await
            .map_err(|d| PlatformError::engine(Stage::Plan, d))?;
        info!("Applying: {}", plan.summary());

        let outcome = context.apply().await;
        self.replace_state(outcome.state);
        let persisted = match self.settings.state_path.clone() {
            Some(path) => self.write_state_to_file(&path),
            None => Ok(()),
        };

        if outcome.diagnostics.has_errors() {
            warn!(
                "Apply stopped with {} resource(s) in state",
                self.state.resources.len()
            );
            if let Err(e) = persisted {
                warn!("Failed to persist the partial state: {}", e);
            }
            return Err(PlatformError::engine(Stage::Apply, outcome.diagnostics));
        }
        persisted?;
        info!("Apply complete: {} resource(s), serial {}", self.state.resources.len(), self.serial);
        Ok(())
    }
}
