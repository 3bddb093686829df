//! The JSON-RPC service: message entry points, the per-request pipeline, api
//! plugin registration and lifecycle.
//!
//! # Pipeline
//!
//! Each message runs through an early-return pipeline. The first failing
//! stage decides the error; the id captured in stage 2 is kept on every
//! later failure.
//!
//! | Stage | Failure | Code |
//! |-------|---------|------|
//! | 1. message is an object | not an object | `PARSE_ERROR` |
//! | 2. `id` is an integer or string | other type | `INVALID_REQUEST` |
//! | 3. `jsonrpc == "2.0"` | absent / other | `INVALID_REQUEST` |
//! | 4. `method` is a string | absent / other | `INVALID_REQUEST` |
//! | 5. normalize params | legacy `call` without params | `NO_PARAMS` |
//! |  | anything else | `PARSE_PARAMS_ERROR` |
//! | 6. dispatch | method not identified | `METHOD_NOT_FOUND` |
//! |  | handler, lock or delegate failure | `ERROR_DURING_CALL` |
//! |  | handler panic | `SERVER_ERROR` |

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use chainrpc_api::{RequestId, RpcError, RpcResponse, Signature, JSONRPC_VERSION};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::catalog;
use crate::config::{ConfigError, RpcConfig};
use crate::context::{discard_push, PushFn};
use crate::dispatch::{CanonicalCall, DispatchError, Dispatcher, RemoteDelegate};
use crate::fixture::{DirectorySink, FixtureRecorder, FixtureSink};
use crate::handler::{read_handler, CallError, Handler};
use crate::lock::ChainLock;
use crate::normalize::{NormalizeError, Normalizer};
use crate::registry::MethodRegistry;

/// Returned when even the error envelope cannot be encoded.
const FALLBACK_RESPONSE: &str =
    r#"{"jsonrpc":"2.0","error":{"code":-32000,"message":"Unknown error - encoding response failed"}}"#;

// ---------------------------------------------------------------------------
// Plugins
// ---------------------------------------------------------------------------

/// A subsystem that serves one api namespace.
pub trait ApiPlugin: Send + Sync {
    fn api_name(&self) -> &str;

    /// Register every method of the api.
    fn register(&self, api: &mut ApiRegistrar<'_>);
}

/// Registration handle scoped to one `(network, api)` pair.
pub struct ApiRegistrar<'a> {
    registry: &'a MethodRegistry,
    network: &'a str,
    api: &'a str,
    count: usize,
}

impl<'a> ApiRegistrar<'a> {
    pub fn new(registry: &'a MethodRegistry, network: &'a str, api: &'a str) -> Self {
        Self {
            registry,
            network,
            api,
            count: 0,
        }
    }

    /// Register a method that manages chain-state locking itself (or needs none).
    pub fn method(&mut self, name: &str, signature: Signature, handler: Handler) -> &mut Self {
        self.registry
            .register(self.network, self.api, name, handler, signature);
        self.count += 1;
        self
    }

    /// Register a method that always runs under the chain-state read lock.
    pub fn read_method(&mut self, name: &str, signature: Signature, handler: Handler) -> &mut Self {
        self.method(name, signature, read_handler(handler))
    }

    pub fn network(&self) -> &str {
        self.network
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

// ---------------------------------------------------------------------------
// Reply
// ---------------------------------------------------------------------------

/// Everything produced for one raw message.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Single(RpcResponse),
    Batch(Vec<RpcResponse>),
}

impl Reply {
    /// `true` if any envelope carries an error.
    pub fn is_error(&self) -> bool {
        match self {
            Reply::Single(response) => response.is_error(),
            Reply::Batch(responses) => responses.iter().any(RpcResponse::is_error),
        }
    }

    pub fn encode(&self) -> String {
        let encoded = match self {
            Reply::Single(response) => serde_json::to_string(response),
            Reply::Batch(responses) => serde_json::to_string(responses),
        };
        encoded.unwrap_or_else(|e| {
            warn!("failed to encode response: {e}");
            FALLBACK_RESPONSE.to_string()
        })
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Initialized,
    Running,
    Stopped,
}

// ---------------------------------------------------------------------------
// RpcServiceBuilder
// ---------------------------------------------------------------------------

/// Collects the injected collaborators of an [`RpcService`].
pub struct RpcServiceBuilder {
    config: RpcConfig,
    delegate: Option<Arc<dyn RemoteDelegate>>,
    chain_lock: Option<Arc<dyn ChainLock>>,
    sink: Option<Box<dyn FixtureSink>>,
}

impl RpcServiceBuilder {
    pub fn delegate(mut self, delegate: Arc<dyn RemoteDelegate>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    pub fn chain_lock(mut self, lock: Arc<dyn ChainLock>) -> Self {
        self.chain_lock = Some(lock);
        self
    }

    /// Capture fixtures into `sink` instead of `config.fixture_dir`.
    pub fn fixture_sink(mut self, sink: Box<dyn FixtureSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Initialize the service: validate config, prepare capture, install the catalog.
    pub fn build(self) -> Result<RpcService, ConfigError> {
        self.config.validate()?;

        let sink = match (self.sink, &self.config.fixture_dir) {
            (Some(sink), _) => Some(sink),
            (None, Some(dir)) => {
                info!("json-rpc fixture capture enabled in {}", dir.display());
                Some(Box::new(DirectorySink::create(dir)?) as Box<dyn FixtureSink>)
            }
            (None, None) => None,
        };

        let registry = Arc::new(MethodRegistry::new());
        let mut dispatcher = Dispatcher::new(registry, &self.config.default_network)
            .with_lock_timeout(self.config.lock_timeout);
        if let Some(delegate) = self.delegate {
            dispatcher = dispatcher.with_delegate(delegate);
        }
        if let Some(lock) = self.chain_lock {
            dispatcher = dispatcher.with_chain_lock(lock);
        }

        catalog::install(dispatcher.registry(), &self.config.default_network);

        Ok(RpcService {
            dispatcher,
            recorder: sink.map(FixtureRecorder::new),
            lifecycle: Mutex::new(Lifecycle::Initialized),
        })
    }
}

// ---------------------------------------------------------------------------
// RpcService
// ---------------------------------------------------------------------------

/// The JSON-RPC endpoint. Shared across connections behind an `Arc`.
pub struct RpcService {
    dispatcher: Dispatcher,
    recorder: Option<FixtureRecorder>,
    lifecycle: Mutex<Lifecycle>,
}

impl RpcService {
    pub fn builder(config: RpcConfig) -> RpcServiceBuilder {
        RpcServiceBuilder {
            config,
            delegate: None,
            chain_lock: None,
            sink: None,
        }
    }

    /// A service with no delegate, no chain lock and config-driven capture.
    pub fn new(config: RpcConfig) -> Result<Self, ConfigError> {
        Self::builder(config).build()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn registry(&self) -> &MethodRegistry {
        self.dispatcher.registry()
    }

    pub fn default_network(&self) -> String {
        self.dispatcher.default_network()
    }

    /// Switch the default network. The catalog methods follow it.
    pub fn set_default_network(&self, network: &str) {
        if !self.registry().contains_api(network, catalog::CATALOG_API) {
            catalog::install(self.registry(), network);
        }
        self.dispatcher.set_default_network(network);
        info!("default network set to {network}");
    }

    pub fn recorder(&self) -> Option<&FixtureRecorder> {
        self.recorder.as_ref()
    }

    // --- Plugins -------------------------------------------------------------

    /// Register `plugin`'s api on the default network.
    pub fn install(&self, plugin: &dyn ApiPlugin) {
        let network = self.default_network();
        self.install_on(&network, plugin);
    }

    /// Register `plugin`'s api on `network`.
    pub fn install_on(&self, network: &str, plugin: &dyn ApiPlugin) {
        let mut registrar = ApiRegistrar::new(self.registry(), network, plugin.api_name());
        plugin.register(&mut registrar);
        info!(
            "registered api {network}.{} ({} methods)",
            plugin.api_name(),
            registrar.count()
        );
    }

    /// Remove every method of `api` on `network`.
    pub fn uninstall(&self, network: &str, api: &str) {
        info!("deregistering api {network}.{api}");
        self.registry().deregister(network, api);
    }

    // --- Lifecycle -----------------------------------------------------------

    pub fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Registration is settled: seal the registry. Idempotent.
    pub fn startup(&self) {
        let mut state = self.lifecycle.lock().unwrap_or_else(|p| p.into_inner());
        match *state {
            Lifecycle::Initialized => {
                self.registry().seal();
                *state = Lifecycle::Running;
                info!("json-rpc service started");
            }
            Lifecycle::Running => debug!("json-rpc service already running"),
            Lifecycle::Stopped => warn!("json-rpc service was stopped; ignoring startup"),
        }
    }

    /// Flush the fixture manifest. Idempotent.
    pub fn shutdown(&self) {
        let mut state = self.lifecycle.lock().unwrap_or_else(|p| p.into_inner());
        if *state == Lifecycle::Stopped {
            return;
        }
        if let Some(recorder) = &self.recorder {
            recorder.finish();
        }
        *state = Lifecycle::Stopped;
        info!("json-rpc service stopped");
    }

    // --- Entry points --------------------------------------------------------

    /// Handle a raw message without server-initiated pushes.
    ///
    /// Returns the encoded response and whether any envelope carries an error.
    pub fn handle(&self, raw: &str) -> (String, bool) {
        let reply = self.reply(raw, &discard_push);
        (reply.encode(), reply.is_error())
    }

    /// Handle a raw message, delivering notifications through `push` as they occur.
    pub fn handle_with_push(&self, raw: &str, push: PushFn<'_>) -> String {
        self.reply(raw, push).encode()
    }

    /// Decode `raw` and process it as a single message or a batch.
    pub fn reply(&self, raw: &str, push: PushFn<'_>) -> Reply {
        match serde_json::from_str::<Value>(raw) {
            Ok(message) => self.reply_value(&message, push),
            Err(e) => Reply::Single(RpcResponse::failure(
                None,
                RpcError::parse_error(format!("Parse error: {e}")),
            )),
        }
    }

    /// Process an already decoded message or batch.
    pub fn reply_value(&self, message: &Value, push: PushFn<'_>) -> Reply {
        match message {
            Value::Array(items) if items.is_empty() => Reply::Single(RpcResponse::failure(
                None,
                RpcError::server_error("Array is invalid"),
            )),
            Value::Array(items) => {
                Reply::Batch(items.iter().map(|item| self.rpc(item, push)).collect())
            }
            other => Reply::Single(self.rpc(other, push)),
        }
    }

    /// Run one message through the pipeline. Never fails: every outcome is
    /// an envelope.
    pub fn rpc(&self, message: &Value, push: PushFn<'_>) -> RpcResponse {
        let Some(request) = message.as_object() else {
            return RpcResponse::failure(
                None,
                RpcError::parse_error("Parse error: message is not a JSON object"),
            );
        };

        let id = match request_id(request) {
            Ok(id) => id,
            Err(error) => return RpcResponse::failure(None, error),
        };

        let (call, outcome) = match self.canonical_call(request) {
            Ok(call) => {
                let outcome = self.execute(&call, push);
                (Some(call), outcome)
            }
            Err(error) => (None, Err(error)),
        };

        let response = RpcResponse::from_outcome(id, outcome);
        self.observe(message, &response, call.as_ref());
        response
    }

    fn canonical_call(&self, request: &Map<String, Value>) -> Result<CanonicalCall, RpcError> {
        if request.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return Err(RpcError::invalid_request("jsonrpc value is not \"2.0\""));
        }

        let method = request
            .get("method")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_request("A member \"method\" does not exist"))?;

        let default_network = self.default_network();
        Normalizer::new(&default_network, self.registry())
            .normalize(method, request)
            .map_err(normalize_error)
    }

    fn execute(&self, call: &CanonicalCall, push: PushFn<'_>) -> Result<Value, RpcError> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.dispatcher.dispatch(call, push)));
        match outcome {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(DispatchError::Unresolved(e))) => Err(RpcError::method_not_found(e.to_string())
                .with_data(json!({ "network": call.network, "api": call.api, "method": call.method }))),
            Ok(Err(DispatchError::Call(e))) => Err(call_error(e)),
            Err(payload) => {
                warn!(%call, "handler panicked");
                Err(RpcError::server_error("Unknown error - handler panicked")
                    .with_data(json!(panic_message(payload.as_ref()))))
            }
        }
    }

    fn observe(&self, request: &Value, response: &RpcResponse, call: Option<&CanonicalCall>) {
        let (api, method) = call
            .map(|c| (c.api.as_str(), c.method.as_str()))
            .unwrap_or(("", ""));
        let status = if response.is_error() { "ERR" } else { "OK" };
        info!(api, method, status, "received request");

        if let Some(recorder) = &self.recorder {
            recorder.record(request, response);
        }
    }
}

fn request_id(request: &Map<String, Value>) -> Result<Option<RequestId>, RpcError> {
    match request.get("id") {
        None => Ok(None),
        Some(raw) => RequestId::from_value(raw).map(Some).ok_or_else(|| {
            RpcError::invalid_request("Only integer value or string is allowed for member \"id\"")
        }),
    }
}

fn normalize_error(e: NormalizeError) -> RpcError {
    match e {
        NormalizeError::NoParams => RpcError::no_params(),
        other => RpcError::parse_params_error(other.to_string())
            .with_data(json!({ "kind": other.kind(), "detail": other.to_string() })),
    }
}

fn call_error(e: CallError) -> RpcError {
    let error = RpcError::error_during_call(e.to_string());
    match e.data() {
        Some(data) => error.with_data(data),
        None => error,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
