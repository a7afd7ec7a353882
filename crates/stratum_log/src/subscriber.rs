//! `tracing` subscriber setup.

use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{LogError, LogResult};

/// Install a global fmt subscriber filtered by `RUST_LOG` plus `directive`.
///
/// Fails if the directive does not parse or a subscriber is already set.
pub fn init_tracing(directive: &str) -> LogResult<()> {
    let directive: Directive = directive
        .parse()
        .map_err(|e| LogError::Subscriber(format!("{directive}: {e}")))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(EnvFilter::from_default_env().add_directive(directive))
        .try_init()
        .map_err(|e| LogError::Subscriber(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_directive() {
        let result = init_tracing("stratum=loud");
        assert!(matches!(result, Err(LogError::Subscriber(_))));
    }
}
