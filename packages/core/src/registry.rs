//! The method registry: network → api → method → handler.
//!
//! All state sits behind one [`RwLock`]. Dispatch takes the read side and
//! walks away with a cloned [`HandlerEntry`] (an `Arc` handle), so a handler
//! never runs while the registry is locked and a concurrent deregistration
//! cannot pull a handler out from under a running call.
//!
//! Alongside the handlers the registry keeps two derived views:
//!
//! | View | Keyed by | Used for |
//! |------|----------|----------|
//! | canonical names | network | `jsonrpc.list_methods` |
//! | signatures | api, method | `jsonrpc.get_signature` (shared by all networks) |

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chainrpc_api::Signature;
use tracing::debug;

use crate::handler::Handler;

// ---------------------------------------------------------------------------
// RegistryError
// ---------------------------------------------------------------------------

/// Why a lookup failed. Each missing level has its own wording.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Could not find network {0}")]
    UnknownNetwork(String),

    #[error("Could not find API {api} on network {network}")]
    UnknownApi { network: String, api: String },

    #[error("Could not find method {method} in API {api}")]
    UnknownMethod { api: String, method: String },

    #[error("Invalid method name {0:?}; expected api.method")]
    InvalidMethodName(String),

    #[error("Method {api}.{method} does not exist")]
    UnknownSignature { api: String, method: String },
}

// ---------------------------------------------------------------------------
// HandlerEntry
// ---------------------------------------------------------------------------

/// A registered handler together with its descriptive signature.
#[derive(Clone)]
pub struct HandlerEntry {
    handler: Handler,
    signature: Signature,
}

impl HandlerEntry {
    pub fn new(handler: Handler, signature: Signature) -> Self {
        Self { handler, signature }
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}

impl std::fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

type ApiTable = HashMap<String, HashMap<String, HandlerEntry>>;

#[derive(Default)]
struct Inner {
    apis: HashMap<String, ApiTable>,
    /// network → canonical `"api.method"` names. Sorted once sealed.
    methods: HashMap<String, Vec<String>>,
    signatures: HashMap<String, HashMap<String, Signature>>,
    sealed: bool,
}

// ---------------------------------------------------------------------------
// MethodRegistry
// ---------------------------------------------------------------------------

/// Thread-safe registry of every locally served method.
#[derive(Default)]
pub struct MethodRegistry {
    inner: RwLock<Inner>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|p| p.into_inner())
    }

    /// Insert or overwrite a method. Last writer wins.
    pub fn register(
        &self,
        network: &str,
        api: &str,
        method: &str,
        handler: Handler,
        signature: Signature,
    ) {
        let mut inner = self.write();
        let sealed = inner.sealed;

        inner
            .apis
            .entry(network.to_string())
            .or_default()
            .entry(api.to_string())
            .or_default()
            .insert(method.to_string(), HandlerEntry::new(handler, signature.clone()));

        inner
            .signatures
            .entry(api.to_string())
            .or_default()
            .insert(method.to_string(), signature);

        let canonical = format!("{api}.{method}");
        let names = inner.methods.entry(network.to_string()).or_default();
        if sealed {
            if let Err(pos) = names.binary_search(&canonical) {
                names.insert(pos, canonical);
            }
        } else if !names.contains(&canonical) {
            names.push(canonical);
        }
    }

    /// Remove every method of `api` on `network`. Drops the network once it
    /// has no apis left. Unknown names are ignored.
    pub fn deregister(&self, network: &str, api: &str) {
        let mut inner = self.write();

        let Some(net) = inner.apis.get_mut(network) else {
            return;
        };
        let removed: HashSet<String> = net
            .remove(api)
            .map(|methods| methods.into_keys().map(|m| format!("{api}.{m}")).collect())
            .unwrap_or_default();
        let now_empty = net.is_empty();

        if now_empty {
            inner.apis.remove(network);
            inner.methods.remove(network);
            debug!(network, api, "network has no apis left; removed");
        } else if let Some(names) = inner.methods.get_mut(network) {
            names.retain(|name| !removed.contains(name));
        }
    }

    /// Resolve a method, reporting which level is missing.
    pub fn lookup(
        &self,
        network: &str,
        api: &str,
        method: &str,
    ) -> Result<HandlerEntry, RegistryError> {
        let inner = self.read();
        let apis = inner
            .apis
            .get(network)
            .ok_or_else(|| RegistryError::UnknownNetwork(network.to_string()))?;
        let methods = apis.get(api).ok_or_else(|| RegistryError::UnknownApi {
            network: network.to_string(),
            api: api.to_string(),
        })?;
        methods
            .get(method)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownMethod {
                api: api.to_string(),
                method: method.to_string(),
            })
    }

    /// Non-failing probe; `None` when any level is missing.
    pub fn try_lookup(&self, network: &str, api: &str, method: &str) -> Option<HandlerEntry> {
        self.read()
            .apis
            .get(network)
            .and_then(|apis| apis.get(api))
            .and_then(|methods| methods.get(method))
            .cloned()
    }

    /// `true` when `api` is served locally on `network`.
    pub fn contains_api(&self, network: &str, api: &str) -> bool {
        self.read()
            .apis
            .get(network)
            .is_some_and(|apis| apis.contains_key(api))
    }

    /// Canonical `"api.method"` names served on `network`.
    pub fn list_methods(&self, network: &str) -> Result<Vec<String>, RegistryError> {
        self.read()
            .methods
            .get(network)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownNetwork(network.to_string()))
    }

    /// Signature of `api.method`, whichever network registered it.
    pub fn get_signature(&self, api: &str, method: &str) -> Result<Signature, RegistryError> {
        self.read()
            .signatures
            .get(api)
            .and_then(|methods| methods.get(method))
            .cloned()
            .ok_or_else(|| RegistryError::UnknownSignature {
                api: api.to_string(),
                method: method.to_string(),
            })
    }

    /// Mark registration as settled and sort every canonical-name list.
    ///
    /// Registrations after this point insert in sorted position.
    pub fn seal(&self) {
        let mut inner = self.write();
        for names in inner.methods.values_mut() {
            names.sort();
            names.dedup();
        }
        inner.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.read().sealed
    }

    /// Networks with at least one registered api, sorted.
    pub fn networks(&self) -> Vec<String> {
        let mut networks: Vec<String> = self.read().apis.keys().cloned().collect();
        networks.sort();
        networks
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
