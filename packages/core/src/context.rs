//! Per-call context handed to every handler.

use serde_json::Value;
use tracing::warn;

use chainrpc_api::Notice;

use crate::dispatch::{CanonicalCall, Dispatcher};
use crate::handler::CallError;
use crate::lock::{LockError, ReadLockHeld};
use crate::registry::MethodRegistry;

/// Transport callback that receives encoded push messages.
pub type PushFn<'a> = &'a dyn Fn(String) -> Result<(), PushError>;

/// The transport refused or failed to deliver a push message.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("failed to push notification: {0}")]
pub struct PushError(pub String);

/// Push callback for entry points without server-initiated delivery.
pub fn discard_push(_message: String) -> Result<(), PushError> {
    Ok(())
}

/// What a handler may do besides computing its result: emit notifications,
/// take the chain-state read lock, and call other registered methods.
pub struct CallContext<'a> {
    dispatcher: &'a Dispatcher,
    push: PushFn<'a>,
    held: Option<&'a ReadLockHeld>,
}

impl<'a> CallContext<'a> {
    pub(crate) fn new(
        dispatcher: &'a Dispatcher,
        push: PushFn<'a>,
        held: Option<&'a ReadLockHeld>,
    ) -> Self {
        Self {
            dispatcher,
            push,
            held,
        }
    }

    /// Deliver `value` to the caller, tagged with `subscription_id`, before
    /// the call returns.
    ///
    /// Best-effort: a failed delivery is logged and returned, but the call
    /// itself continues unless the handler decides otherwise.
    pub fn notify(&self, subscription_id: u64, value: Value) -> Result<(), PushError> {
        let notice = Notice::new(subscription_id, value);
        let message = serde_json::to_string(&notice).map_err(|e| PushError(e.to_string()))?;
        (self.push)(message).inspect_err(|e| {
            warn!(subscription_id, "dropping notification: {e}");
        })
    }

    /// The proof token when this call path already holds the read lock.
    pub fn lock_held(&self) -> Option<&'a ReadLockHeld> {
        self.held
    }

    /// Run `f` while holding the chain-state read lock.
    ///
    /// When the lock is already held on this call path, or no chain lock is
    /// configured, `f` runs immediately. Otherwise the lock is taken with the
    /// configured timeout; a timeout fails with [`CallError::Lock`].
    pub fn with_read_lock<T, F>(&self, f: F) -> Result<T, CallError>
    where
        F: FnOnce(&CallContext<'_>) -> Result<T, CallError>,
    {
        if self.held.is_some() {
            return f(self);
        }

        let token = ReadLockHeld::new();
        let Some(lock) = self.dispatcher.chain_lock() else {
            return f(&CallContext::new(self.dispatcher, self.push, Some(&token)));
        };

        let timeout = self.dispatcher.lock_timeout();
        let _guard = lock.read_for(timeout).ok_or(LockError::Timeout(timeout))?;
        f(&CallContext::new(self.dispatcher, self.push, Some(&token)))
    }

    /// Call another registered method from inside this handler.
    ///
    /// The nested call inherits this context's lock state and push channel.
    pub fn call(
        &self,
        network: &str,
        api: &str,
        method: &str,
        args: Value,
    ) -> Result<Value, CallError> {
        let call = CanonicalCall::new(network, api, method, args);
        self.dispatcher
            .invoke(&call, self.push, self.held)
            .map_err(CallError::from)
    }

    /// Network used when a caller does not name one.
    pub fn default_network(&self) -> String {
        self.dispatcher.default_network()
    }

    pub fn registry(&self) -> &'a MethodRegistry {
        self.dispatcher.registry()
    }

    /// Allocate a fresh subscription id for notifications.
    pub fn generate_subscription_id(&self) -> u64 {
        self.dispatcher.generate_subscription_id()
    }
}
