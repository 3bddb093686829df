//! The JSON-RPC error object and the stable error code table.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The `error` member of a failed [`RpcResponse`](crate::RpcResponse).
///
/// ```json
/// { "code": -32601, "message": "Could not find API block_api", "data": { "detail": "..." } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcError {
    /// Numeric category code, one of [`codes`].
    pub code: i32,

    /// Human-readable description of the failure.
    pub message: String,

    /// Optional structured diagnostic payload. `Some(Value::Null)` is kept
    /// distinct from absent.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::response::deserialize_present"
    )]
    pub data: Option<Value>,
}

impl RpcError {
    /// Construct an [`RpcError`] without diagnostic data.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attach a diagnostic payload.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(codes::PARSE_ERROR, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(codes::INVALID_REQUEST, message)
    }

    pub fn method_not_found(message: impl Into<String>) -> Self {
        Self::new(codes::METHOD_NOT_FOUND, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(codes::SERVER_ERROR, message)
    }

    pub fn no_params() -> Self {
        Self::new(codes::NO_PARAMS, "A member \"params\" does not exist")
    }

    pub fn parse_params_error(message: impl Into<String>) -> Self {
        Self::new(codes::PARSE_PARAMS_ERROR, message)
    }

    pub fn error_during_call(message: impl Into<String>) -> Self {
        Self::new(codes::ERROR_DURING_CALL, message)
    }
}

/// Stable error codes, one per failure category.
///
/// | Constant | Code | Raised when |
/// |----------|------|-------------|
/// | [`PARSE_ERROR`] | -32700 | message is not JSON, or not an object |
/// | [`INVALID_REQUEST`] | -32600 | bad `jsonrpc`, missing `method`, bad `id` type |
/// | [`METHOD_NOT_FOUND`] | -32601 | network, api or method unresolved |
/// | [`INVALID_PARAMS`] | -32602 | reserved by JSON-RPC 2.0, not raised by the engine |
/// | [`INTERNAL_ERROR`] | -32603 | reserved by JSON-RPC 2.0, not raised by the engine |
/// | [`SERVER_ERROR`] | -32000 | unclassified failure, empty batch, handler panic |
/// | [`NO_PARAMS`] | -32001 | legacy `call` without `params` |
/// | [`PARSE_PARAMS_ERROR`] | -32002 | argument normalization failed |
/// | [`ERROR_DURING_CALL`] | -32003 | the resolved handler failed |
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const SERVER_ERROR: i32 = -32000;
    pub const NO_PARAMS: i32 = -32001;
    pub const PARSE_PARAMS_ERROR: i32 = -32002;
    pub const ERROR_DURING_CALL: i32 = -32003;
}
