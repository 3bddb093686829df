//! Built-in introspection methods under the `jsonrpc` api.
//!
//! | Method | Args | Result |
//! |--------|------|--------|
//! | `jsonrpc.list_methods` | optional network | sorted `"api.method"` names |
//! | `jsonrpc.get_methods` | optional network | same; older clients use this name |
//! | `jsonrpc.get_signature` | `{"method": "api.method"}` | [`Signature`] |

use serde::Deserialize;
use serde_json::{json, Value};

use chainrpc_api::Signature;

use crate::context::CallContext;
use crate::handler::{handler, typed, CallError};
use crate::registry::{MethodRegistry, RegistryError};

/// Api namespace of the introspection methods.
pub const CATALOG_API: &str = "jsonrpc";

#[derive(Debug, Deserialize)]
struct GetSignatureArgs {
    method: String,
}

/// Register the catalog methods on `network`.
pub fn install(registry: &MethodRegistry, network: &str) {
    let list_signature = Signature::new(json!("mainnet"), json!(["api.method"]));
    for name in ["list_methods", "get_methods"] {
        registry.register(
            network,
            CATALOG_API,
            name,
            handler(list_methods),
            list_signature.clone(),
        );
    }

    registry.register(
        network,
        CATALOG_API,
        "get_signature",
        typed(get_signature),
        Signature::new(
            json!({ "method": "api.method" }),
            json!({ "args": {}, "ret": {} }),
        ),
    );
}

fn list_methods(args: Value, ctx: &CallContext<'_>) -> Result<Value, CallError> {
    let network = network_arg(&args)?.unwrap_or_else(|| ctx.default_network());
    let names = ctx.registry().list_methods(&network)?;
    Ok(json!(names))
}

fn get_signature(args: GetSignatureArgs, ctx: &CallContext<'_>) -> Result<Signature, CallError> {
    let (api, method) = args
        .method
        .split_once('.')
        .filter(|(api, method)| !api.is_empty() && !method.is_empty() && !method.contains('.'))
        .ok_or_else(|| RegistryError::InvalidMethodName(args.method.clone()))?;
    Ok(ctx.registry().get_signature(api, method)?)
}

/// Accepts `null`, `{}`, `[]`, `"net"`, `["net"]` or `{"network": "net"}`.
fn network_arg(args: &Value) -> Result<Option<String>, CallError> {
    let invalid = || CallError::InvalidArgs("expected an optional network name".into());
    match args {
        Value::Null => Ok(None),
        Value::String(network) => Ok(Some(network.clone())),
        Value::Array(items) => match items.as_slice() {
            [] => Ok(None),
            [Value::String(network)] => Ok(Some(network.clone())),
            _ => Err(invalid()),
        },
        Value::Object(map) => match map.get("network") {
            None if map.is_empty() => Ok(None),
            Some(Value::String(network)) => Ok(Some(network.clone())),
            _ => Err(invalid()),
        },
        _ => Err(invalid()),
    }
}
