//! Handler callables and the failures they may raise.
//!
//! A [`Handler`] is an opaque, shareable callable
//! `(args, &CallContext) -> Result<Value, CallError>`. Plugins rarely build
//! one by hand; the adapters below cover the common shapes:
//!
//! | Adapter | Use |
//! |---------|-----|
//! | [`handler`] | raw `serde_json::Value` in and out |
//! | [`typed`] | deserialize args into `A`, serialize the `R` result |
//! | [`read_handler`] | run any handler under the shared chain-state read lock |

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};

use crate::context::CallContext;
use crate::lock::LockError;
use crate::registry::RegistryError;

/// A registered method implementation.
pub type Handler =
    Arc<dyn Fn(Value, &CallContext<'_>) -> Result<Value, CallError> + Send + Sync + 'static>;

/// A failure raised by a handler (or by the remote delegate standing in for one).
///
/// Every variant is reported to the client as an error during call; the
/// variant only decides the diagnostic payload.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    /// Business-logic or assertion failure.
    #[error("{message}")]
    Failed {
        message: String,
        data: Option<Value>,
    },

    /// The arguments could not be decoded into the handler's expected shape.
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    /// The chain-state lock could not be acquired.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// A nested call or catalog lookup named something that is not registered.
    #[error(transparent)]
    NotFound(#[from] RegistryError),

    /// The remote delegate failed to produce a result.
    #[error("remote call failed: {0}")]
    Remote(String),
}

impl CallError {
    pub fn failed(message: impl Into<String>) -> Self {
        CallError::Failed {
            message: message.into(),
            data: None,
        }
    }

    pub fn failed_with(message: impl Into<String>, data: Value) -> Self {
        CallError::Failed {
            message: message.into(),
            data: Some(data),
        }
    }

    /// Diagnostic payload attached to the wire error.
    pub fn data(&self) -> Option<Value> {
        match self {
            CallError::Failed { data, .. } => data.clone(),
            CallError::InvalidArgs(_) => Some(json!({ "kind": "invalid_args" })),
            CallError::Lock(_) => Some(json!({ "kind": "lock" })),
            CallError::NotFound(_) => Some(json!({ "kind": "not_found" })),
            CallError::Remote(_) => Some(json!({ "kind": "remote" })),
        }
    }
}

/// Box a closure as a [`Handler`].
///
/// Going through this function (rather than `Arc::new` directly) lets the
/// compiler infer the closure's higher-ranked context parameter.
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(Value, &CallContext<'_>) -> Result<Value, CallError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Adapt a strongly typed function into a [`Handler`].
///
/// Argument decoding failures surface as [`CallError::InvalidArgs`].
pub fn typed<A, R, F>(f: F) -> Handler
where
    A: DeserializeOwned,
    R: Serialize,
    F: Fn(A, &CallContext<'_>) -> Result<R, CallError> + Send + Sync + 'static,
{
    handler(move |args, ctx| {
        let args: A =
            serde_json::from_value(args).map_err(|e| CallError::InvalidArgs(e.to_string()))?;
        let ret = f(args, ctx)?;
        serde_json::to_value(ret)
            .map_err(|e| CallError::failed(format!("failed to encode result: {e}")))
    })
}

/// Wrap `inner` so it always executes while holding the chain-state read lock.
///
/// If the calling context already holds the lock (a nested call), `inner`
/// runs directly instead of acquiring it a second time.
pub fn read_handler(inner: Handler) -> Handler {
    handler(move |args, ctx| ctx.with_read_lock(|ctx| inner(args, ctx)))
}
