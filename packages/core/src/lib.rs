//! Request-dispatch core of a JSON-RPC 2.0 endpoint for a blockchain node.
//!
//! Subsystems register their methods as `(network, api, method)` triples;
//! clients reach them through one endpoint using any of three calling
//! grammars. This crate owns everything between a decoded message and the
//! response envelope. Transports (HTTP, WebSocket) live in `chainrpc-node`.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`registry`] | Network-scoped method table plus the signature catalog |
//! | [`normalize`] | The three request grammars to one [`CanonicalCall`] |
//! | [`dispatch`] | Local/remote routing, chain-state lock discipline |
//! | [`context`] | What a running handler can do: notify, lock, nest calls |
//! | [`handler`] | The [`Handler`] type and adapters that build one |
//! | [`lock`] | The [`ChainLock`] seam and the held-lock proof token |
//! | [`catalog`] | Built-in `jsonrpc.*` introspection methods |
//! | [`fixture`] | Optional request/response capture for regression tests |
//! | [`service`] | [`RpcService`]: pipeline, batching, plugins, lifecycle |
//! | [`config`] | [`RpcConfig`] |
//!
//! # Quick start
//!
//! ```rust,ignore
//! use chainrpc::{handler, RpcConfig, RpcService, Signature};
//! use serde_json::json;
//!
//! let service = RpcService::new(RpcConfig::default())?;
//! service.registry().register(
//!     "mainnet",
//!     "chain",
//!     "ping",
//!     handler(|_, _| Ok(json!("pong"))),
//!     Signature::default(),
//! );
//! service.startup();
//!
//! let (body, is_error) =
//!     service.handle(r#"{"jsonrpc":"2.0","method":"chain.ping","id":1}"#);
//! assert!(!is_error);
//! ```

pub mod catalog;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod fixture;
pub mod handler;
pub mod lock;
pub mod normalize;
pub mod registry;
pub mod service;

pub use chainrpc_api::{
    codes, Notice, RequestId, RpcError, RpcResponse, Signature, JSONRPC_VERSION,
};
pub use config::{ConfigError, RpcConfig, DEFAULT_NETWORK};
pub use context::{discard_push, CallContext, PushError, PushFn};
pub use dispatch::{CanonicalCall, DispatchError, Dispatcher, RemoteDelegate};
pub use fixture::{DirectorySink, FixtureError, FixtureRecorder, FixtureSink};
pub use handler::{handler, read_handler, typed, CallError, Handler};
pub use lock::{ChainLock, LockError, ReadGuard, ReadLockHeld, RwChainLock};
pub use normalize::{NormalizeError, Normalizer};
pub use registry::{HandlerEntry, MethodRegistry, RegistryError};
pub use service::{ApiPlugin, ApiRegistrar, Lifecycle, Reply, RpcService, RpcServiceBuilder};
