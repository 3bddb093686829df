//! `chainrpc-node`: JSON-RPC 2.0 endpoint for a blockchain node.
//!
//! # Quick start
//!
//! ```sh
//! # Default network "mainnet" on port 8090:
//! chainrpc-node
//!
//! # Capture request/response fixtures while exercising the node:
//! CHAINRPC_LOG_JSON_RPC=./fixtures chainrpc-node
//!
//! # Forward apis this node does not serve to an upstream:
//! CHAINRPC_REMOTE_URL=http://10.0.0.5:8090/rpc chainrpc-node
//! ```
//!
//! # Environment variables
//!
//! See [`chainrpc_node::NodeConfig::from_env`] for the full list.

use std::sync::Arc;

use chainrpc::RwChainLock;
use chainrpc_node::{build_router, build_service, NodeConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "chainrpc=info,chainrpc_node=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = NodeConfig::from_env();

    let chain_lock = Arc::new(RwChainLock::new());
    let service = Arc::new(
        build_service(&config, chain_lock)
            .unwrap_or_else(|e| panic!("failed to initialize json-rpc service: {e}")),
    );
    service.startup();

    let app = build_router(Arc::clone(&service));

    tracing::info!(
        "listening on {} (default network {})",
        config.bind_addr,
        config.default_network
    );
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {e}", config.bind_addr));

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await
        .expect("server error");

    service.shutdown();
}
