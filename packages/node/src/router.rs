//! Assembles the Axum [`Router`] for the JSON-RPC endpoint.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use chainrpc::RpcService;
use tower_http::trace::TraceLayer;

use crate::handlers::{rpc, ws, AppState};

/// Build the application router around a ready [`RpcService`].
pub fn build_router(service: Arc<RpcService>) -> Router {
    let state = AppState { service };

    Router::new()
        .route("/rpc", post(rpc::handle))
        .route("/ws", get(ws::upgrade))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
