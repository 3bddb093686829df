//! Public surface for the `chainrpc-node` crate.
//!
//! Exposes the router builder, config, remote delegate and built-in api so
//! that external crates (e.g. the conformance test suite) can spin up an
//! in-process node without spawning a subprocess.

pub mod apis;
pub mod config;
pub mod delegate;
pub mod handlers;
pub mod router;

use std::sync::Arc;

use chainrpc::{ChainLock, ConfigError, RpcService};

pub use apis::NodeApi;
pub use config::NodeConfig;
pub use delegate::{DelegateError, HttpDelegate};
pub use router::build_router;

/// Errors raised while assembling a node.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("remote delegate setup failed: {0}")]
    Delegate(#[from] DelegateError),
}

/// Build the service for `config`: delegate if configured, the shared chain
/// lock, and the built-in `node` api on the default network.
///
/// Must be called inside a tokio runtime when `remote_url` is set.
pub fn build_service(
    config: &NodeConfig,
    chain_lock: Arc<dyn ChainLock>,
) -> Result<RpcService, NodeError> {
    let mut builder = RpcService::builder(config.rpc_config()).chain_lock(chain_lock);
    if let Some(url) = &config.remote_url {
        tracing::info!("remote delegation: forwarding unknown apis to {url}");
        builder = builder.delegate(Arc::new(HttpDelegate::connect(url.clone())?));
    }
    let service = builder.build()?;
    service.install(&NodeApi);
    Ok(service)
}
