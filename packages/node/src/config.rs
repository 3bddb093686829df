//! Node configuration, populated from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use chainrpc::config::{RpcConfig, DEFAULT_LOCK_TIMEOUT, DEFAULT_NETWORK};

/// Runtime configuration for a chainrpc node.
///
/// All fields are populated from environment variables with sensible
/// defaults, so a node can be started with zero configuration.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `CHAINRPC_BIND` | `0.0.0.0:8090` | TCP socket address to listen on |
/// | `CHAINRPC_DEFAULT_NETWORK` | `mainnet` | Network used when a request names none |
/// | `CHAINRPC_LOG_JSON_RPC` | (absent = disabled) | Directory for request/response fixture capture |
/// | `CHAINRPC_LOCK_TIMEOUT_MS` | `1000` | Maximum wait for the chain-state read lock |
/// | `CHAINRPC_REMOTE_URL` | (absent) | Upstream JSON-RPC endpoint for apis not served locally |
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Socket address the server binds to.
    pub bind_addr: SocketAddr,

    pub default_network: String,

    /// `None` disables fixture capture.
    pub fixture_dir: Option<PathBuf>,

    pub lock_timeout: Duration,

    /// Full URL of the upstream endpoint, e.g. `"http://10.0.0.5:8090/rpc"`.
    /// `None` means unresolved apis fail with method-not-found.
    pub remote_url: Option<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8090)),
            default_network: DEFAULT_NETWORK.to_string(),
            fixture_dir: None,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            remote_url: None,
        }
    }
}

impl NodeConfig {
    /// Populate config from environment variables, applying defaults where absent.
    pub fn from_env() -> Self {
        let bind_addr: SocketAddr = std::env::var("CHAINRPC_BIND")
            .unwrap_or_else(|_| "0.0.0.0:8090".into())
            .parse()
            .expect("CHAINRPC_BIND must be a valid socket address (e.g. 0.0.0.0:8090)");

        let lock_timeout = std::env::var("CHAINRPC_LOCK_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_LOCK_TIMEOUT);

        Self {
            bind_addr,
            default_network: std::env::var("CHAINRPC_DEFAULT_NETWORK")
                .unwrap_or_else(|_| DEFAULT_NETWORK.into()),
            fixture_dir: std::env::var_os("CHAINRPC_LOG_JSON_RPC").map(PathBuf::from),
            lock_timeout,
            remote_url: std::env::var("CHAINRPC_REMOTE_URL")
                .ok()
                .filter(|url| !url.is_empty()),
        }
    }

    /// The engine-level part of this config.
    pub fn rpc_config(&self) -> RpcConfig {
        RpcConfig {
            default_network: self.default_network.clone(),
            fixture_dir: self.fixture_dir.clone(),
            lock_timeout: self.lock_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_config_carries_engine_fields() {
        let config = NodeConfig {
            default_network: "testnet".into(),
            fixture_dir: Some(PathBuf::from("/tmp/fx")),
            lock_timeout: Duration::from_millis(250),
            ..NodeConfig::default()
        };
        let rpc = config.rpc_config();
        assert_eq!(rpc.default_network, "testnet");
        assert_eq!(rpc.fixture_dir, Some(PathBuf::from("/tmp/fx")));
        assert_eq!(rpc.lock_timeout, Duration::from_millis(250));
    }

    #[test]
    fn default_listens_on_8090() {
        assert_eq!(NodeConfig::default().bind_addr.port(), 8090);
    }
}
