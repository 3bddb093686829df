//! HTTP and WebSocket handlers for the JSON-RPC endpoint.
//!
//! Both transports feed raw message text into the shared [`RpcService`]. The
//! engine is synchronous and handlers may block on the chain lock, so every
//! message runs on `tokio::task::spawn_blocking`.

pub mod rpc;
pub mod ws;

use std::sync::Arc;

use chainrpc::RpcService;

/// Shared application state threaded through all Axum handlers via [`axum::extract::State`].
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RpcService>,
}
