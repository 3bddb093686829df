//! Remote delegation over HTTP.
//!
//! Calls for apis this node does not serve are forwarded to an upstream
//! JSON-RPC endpoint in the three-segment `network.api.method` form, so the
//! upstream routes them exactly as resolved here.
//!
//! The engine calls delegates synchronously from a blocking worker thread;
//! [`HttpDelegate`] bridges to the async [`reqwest::Client`] by blocking on
//! the runtime handle it was created with.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chainrpc::{CallError, CanonicalCall, RemoteDelegate, RpcResponse, JSONRPC_VERSION};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::runtime::Handle;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// DelegateError
// ---------------------------------------------------------------------------

/// Transport-level failures talking to the upstream.
#[derive(Debug, thiserror::Error)]
pub enum DelegateError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned status {0}")]
    BadStatus(u16),

    #[error("upstream response carries neither result nor error")]
    EmptyResponse,
}

// ---------------------------------------------------------------------------
// HttpDelegate
// ---------------------------------------------------------------------------

/// A [`RemoteDelegate`] posting to another node's `/rpc` endpoint.
pub struct HttpDelegate {
    client: Client,
    url: String,
    runtime: Handle,
    next_id: AtomicU64,
}

impl HttpDelegate {
    /// `url` is the full endpoint, e.g. `http://10.0.0.5:8090/rpc`.
    pub fn new(client: Client, url: impl Into<String>, runtime: Handle) -> Self {
        Self {
            client,
            url: url.into(),
            runtime,
            next_id: AtomicU64::new(1),
        }
    }

    /// Build with a default client (10 s timeout) on the current runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn connect(url: impl Into<String>) -> Result<Self, DelegateError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self::new(client, url, Handle::current()))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post(&self, body: Value) -> Result<RpcResponse, DelegateError> {
        let resp = self.client.post(&self.url).json(&body).send().await?;
        if !resp.status().is_success() {
            return Err(DelegateError::BadStatus(resp.status().as_u16()));
        }
        Ok(resp.json::<RpcResponse>().await?)
    }
}

impl RemoteDelegate for HttpDelegate {
    fn is_ready(&self) -> bool {
        !self.url.is_empty()
    }

    fn call(&self, call: &CanonicalCall) -> Result<Value, CallError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": JSONRPC_VERSION,
            "method": call.to_string(),
            "params": call.args,
            "id": id,
        });
        debug!(%call, url = %self.url, "forwarding call upstream");

        let response = self.runtime.block_on(self.post(body)).map_err(|e| {
            warn!(%call, "remote call failed: {e}");
            CallError::Remote(e.to_string())
        })?;

        match (response.result, response.error) {
            (_, Some(error)) => Err(CallError::Failed {
                message: error.message,
                data: error.data,
            }),
            (Some(result), None) => Ok(result),
            (None, None) => Err(CallError::Remote(DelegateError::EmptyResponse.to_string())),
        }
    }
}
