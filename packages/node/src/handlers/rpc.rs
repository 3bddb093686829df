//! `POST /rpc`: one message or batch per request body.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chainrpc::{RpcError, RpcResponse};
use tracing::error;

use super::AppState;

/// `POST /rpc`
///
/// Always answers `200 OK` with a JSON body; protocol failures are reported
/// inside the envelope, never through the HTTP status.
pub async fn handle(State(state): State<AppState>, body: String) -> Response {
    let service = state.service.clone();
    let text = match tokio::task::spawn_blocking(move || service.handle(&body).0).await {
        Ok(text) => text,
        Err(e) => {
            error!("rpc worker failed: {e}");
            let envelope = RpcResponse::failure(None, RpcError::server_error(e.to_string()));
            serde_json::to_string(&envelope).unwrap_or_default()
        }
    };
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        text,
    )
        .into_response()
}
