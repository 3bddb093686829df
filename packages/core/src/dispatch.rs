//! Resolves a [`CanonicalCall`] to a local handler or the remote delegate and
//! invokes it.
//!
//! # Resolution order
//!
//! 1. `(network, api)` registered locally → look up the method and call it.
//! 2. Otherwise, a configured delegate that reports ready → forward the call.
//! 3. Otherwise → [`DispatchError::Unresolved`] with the registry's wording.
//!
//! The dispatcher never serializes handler execution; concurrent requests
//! run concurrently unless a handler blocks on the chain lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::config::DEFAULT_LOCK_TIMEOUT;
use crate::context::{CallContext, PushFn};
use crate::handler::CallError;
use crate::lock::{ChainLock, ReadLockHeld};
use crate::registry::{HandlerEntry, MethodRegistry, RegistryError};

// ---------------------------------------------------------------------------
// CanonicalCall
// ---------------------------------------------------------------------------

/// A fully routed call: produced once per request, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalCall {
    pub network: String,
    pub api: String,
    pub method: String,
    pub args: Value,
}

impl CanonicalCall {
    pub fn new(network: &str, api: &str, method: &str, args: Value) -> Self {
        Self {
            network: network.to_string(),
            api: api.to_string(),
            method: method.to_string(),
            args,
        }
    }
}

impl std::fmt::Display for CanonicalCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.network, self.api, self.method)
    }
}

// ---------------------------------------------------------------------------
// RemoteDelegate
// ---------------------------------------------------------------------------

/// Fallback backend for apis that are not served locally.
pub trait RemoteDelegate: Send + Sync {
    /// Whether the backend is connected and may receive calls.
    fn is_ready(&self) -> bool;

    /// Execute `call` remotely.
    fn call(&self, call: &CanonicalCall) -> Result<Value, CallError>;
}

// ---------------------------------------------------------------------------
// DispatchError
// ---------------------------------------------------------------------------

/// Outcome of a failed dispatch.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The method could not be identified.
    #[error(transparent)]
    Unresolved(RegistryError),

    /// The method was identified, and then its handler (or the delegate) failed.
    #[error(transparent)]
    Call(CallError),
}

impl From<DispatchError> for CallError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::Unresolved(e) => CallError::NotFound(e),
            DispatchError::Call(e) => e,
        }
    }
}

enum Target {
    Local(HandlerEntry),
    Remote(Arc<dyn RemoteDelegate>),
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Routes calls and owns everything a handler may reach through its
/// [`CallContext`].
pub struct Dispatcher {
    registry: Arc<MethodRegistry>,
    delegate: Option<Arc<dyn RemoteDelegate>>,
    chain_lock: Option<Arc<dyn ChainLock>>,
    lock_timeout: Duration,
    default_network: RwLock<String>,
    next_subscription_id: AtomicU64,
}

impl Dispatcher {
    pub fn new(registry: Arc<MethodRegistry>, default_network: &str) -> Self {
        Self {
            registry,
            delegate: None,
            chain_lock: None,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            default_network: RwLock::new(default_network.to_string()),
            next_subscription_id: AtomicU64::new(0),
        }
    }

    pub fn with_delegate(mut self, delegate: Arc<dyn RemoteDelegate>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    pub fn with_chain_lock(mut self, lock: Arc<dyn ChainLock>) -> Self {
        self.chain_lock = Some(lock);
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &MethodRegistry {
        &self.registry
    }

    pub fn shared_registry(&self) -> Arc<MethodRegistry> {
        Arc::clone(&self.registry)
    }

    pub(crate) fn chain_lock(&self) -> Option<&dyn ChainLock> {
        self.chain_lock.as_deref()
    }

    pub(crate) fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    pub fn default_network(&self) -> String {
        self.default_network
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn set_default_network(&self, network: &str) {
        *self
            .default_network
            .write()
            .unwrap_or_else(|p| p.into_inner()) = network.to_string();
    }

    /// Next id for tagging notifications. Starts at 0.
    pub fn generate_subscription_id(&self) -> u64 {
        self.next_subscription_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Outward-facing entry: read handlers acquire the chain lock themselves.
    pub fn dispatch(&self, call: &CanonicalCall, push: PushFn<'_>) -> Result<Value, DispatchError> {
        self.invoke(call, push, None)
    }

    /// Re-entrant entry for subsystems that already hold the chain read lock.
    ///
    /// The `held` token makes the handler skip lock acquisition.
    pub fn call_held(
        &self,
        call: &CanonicalCall,
        held: &ReadLockHeld,
        push: PushFn<'_>,
    ) -> Result<Value, DispatchError> {
        self.invoke(call, push, Some(held))
    }

    pub(crate) fn invoke(
        &self,
        call: &CanonicalCall,
        push: PushFn<'_>,
        held: Option<&ReadLockHeld>,
    ) -> Result<Value, DispatchError> {
        match self.resolve(call)? {
            Target::Local(entry) => {
                let ctx = CallContext::new(self, push, held);
                (entry.handler())(call.args.clone(), &ctx).map_err(DispatchError::Call)
            }
            Target::Remote(delegate) => {
                debug!(%call, "forwarding to remote delegate");
                delegate.call(call).map_err(DispatchError::Call)
            }
        }
    }

    fn resolve(&self, call: &CanonicalCall) -> Result<Target, DispatchError> {
        if !self.registry.contains_api(&call.network, &call.api) {
            if let Some(delegate) = self.delegate.as_ref().filter(|d| d.is_ready()) {
                return Ok(Target::Remote(Arc::clone(delegate)));
            }
        }
        self.registry
            .lookup(&call.network, &call.api, &call.method)
            .map(Target::Local)
            .map_err(DispatchError::Unresolved)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
