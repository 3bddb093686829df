//! Server-initiated push messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::response::JSONRPC_VERSION;

/// Method name carried by every push message.
pub const NOTICE_METHOD: &str = "notice";

/// An out-of-band notification delivered while a call is still running.
///
/// Serialises as a JSON-RPC notification whose `params` pair the caller's
/// subscription id with a one-element array holding the value:
///
/// ```json
/// { "jsonrpc": "2.0", "method": "notice", "params": [42, [{ "block": 17 }]] }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notice {
    pub jsonrpc: String,
    pub method: String,
    pub params: (u64, Vec<Value>),
}

impl Notice {
    pub fn new(subscription_id: u64, value: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: NOTICE_METHOD.to_string(),
            params: (subscription_id, vec![value]),
        }
    }

    pub fn subscription_id(&self) -> u64 {
        self.params.0
    }
}
