//! Engine configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::fixture::FixtureError;

/// Network used whenever a request carries no routing hint.
pub const DEFAULT_NETWORK: &str = "mainnet";

/// Default bound on how long a read handler waits for the chain-state lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(1000);

/// Runtime configuration for an [`RpcService`](crate::RpcService).
///
/// The engine itself never reads the environment; hosts populate this struct
/// (see `chainrpc-node`'s `NodeConfig::from_env`).
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// Network assumed when a request omits one.
    pub default_network: String,

    /// Directory for request/response fixture capture.
    /// `None` disables capture entirely.
    pub fixture_dir: Option<PathBuf>,

    /// Maximum wait for the shared chain-state read lock.
    pub lock_timeout: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            default_network: DEFAULT_NETWORK.to_string(),
            fixture_dir: None,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

impl RpcConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_network.trim().is_empty() {
            return Err(ConfigError::EmptyNetwork);
        }
        Ok(())
    }
}

/// Errors raised while building an [`RpcService`](crate::RpcService).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("default network name must not be empty")]
    EmptyNetwork,

    #[error("fixture capture setup failed: {0}")]
    Fixture(#[from] FixtureError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(RpcConfig::default().validate().is_ok());
    }

    #[test]
    fn blank_network_is_rejected() {
        let config = RpcConfig {
            default_network: "  ".into(),
            ..RpcConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::EmptyNetwork)));
    }
}
