//! Shared helpers for the chainrpc conformance test suite.
//!
//! Provides [`spawn_node`], which binds a `TcpListener` on an ephemeral
//! port, wires up an in-process node, and returns both the local URL and the
//! underlying [`RpcService`] so tests can register extra apis without going
//! through the HTTP layer.

use std::sync::Arc;

use chainrpc::{RpcService, RwChainLock};
use chainrpc_node::{build_router, build_service, NodeConfig};

/// Start an ephemeral in-process node with the default configuration and
/// return `(base_url, service)`.
///
/// The node runs in a background `tokio` task bound to an OS-assigned port on
/// `127.0.0.1`. The returned `String` is the base URL, e.g.
/// `http://127.0.0.1:51234`; the endpoint itself is `{base_url}/rpc`.
///
/// # Panics
///
/// Panics if the TCP listener cannot be bound or the node fails to start.
pub async fn spawn_node() -> (String, Arc<RpcService>) {
    spawn_node_with(NodeConfig::default()).await
}

/// As [`spawn_node`], with `config` (its `bind_addr` is ignored).
pub async fn spawn_node_with(mut config: NodeConfig) -> (String, Arc<RpcService>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("get local addr");
    config.bind_addr = addr;

    let service = Arc::new(
        build_service(&config, Arc::new(RwChainLock::new())).expect("build conformance service"),
    );
    service.startup();
    let router = build_router(Arc::clone(&service));

    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("conformance node error");
    });

    (format!("http://{addr}"), service)
}
