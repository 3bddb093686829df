//! Turns one decoded request object into a [`CanonicalCall`].
//!
//! Three calling grammars are accepted, checked in this order:
//!
//! | `method` | `params` | Routed to |
//! |----------|----------|-----------|
//! | `"call"` | `[api, method]` | default network, args `{}` |
//! | `"call"` | `[network, api, method, args]` | as given |
//! | `"call"` | `[a, b, "c"]` | `a.b.c` with args `{}` if registered, else `a.b` with args `"c"` |
//! | `"call"` | `[api, method, args]` | default network |
//! | `"api.method"` | anything | default network, or `params.network_id` when present |
//! | `"network.api.method"` | anything | as given |
//!
//! Only the ambiguous three-element legacy form consults the registry.

use serde_json::{Map, Value};

use crate::dispatch::CanonicalCall;
use crate::registry::MethodRegistry;

/// Why a request could not be normalized.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("A member \"params\" does not exist")]
    NoParams,

    #[error(
        "params should be {{\"api\", \"method\", \"args\"}} or \
         {{\"network\", \"api\", \"method\", \"args\"}}, got {0}"
    )]
    InvalidArity(String),

    #[error("params[{0}] must be a string")]
    NotAString(usize),

    #[error("network_id must be a string")]
    InvalidNetworkId,

    #[error("method specification invalid. Should be api.method or network.api.method, got {0:?}")]
    InvalidMethodSpec(String),
}

impl NormalizeError {
    /// Coarse category used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            NormalizeError::NoParams => "no_params",
            NormalizeError::InvalidMethodSpec(_) => "invalid_request",
            NormalizeError::InvalidArity(_)
            | NormalizeError::NotAString(_)
            | NormalizeError::InvalidNetworkId => "invalid_params",
        }
    }
}

/// Method name that selects the legacy positional grammar.
pub const LEGACY_CALL: &str = "call";

fn empty_args() -> Value {
    Value::Object(Map::new())
}

/// Normalizes requests against one default network and registry.
pub struct Normalizer<'a> {
    default_network: &'a str,
    registry: &'a MethodRegistry,
}

impl<'a> Normalizer<'a> {
    pub fn new(default_network: &'a str, registry: &'a MethodRegistry) -> Self {
        Self {
            default_network,
            registry,
        }
    }

    /// Normalize `request`, whose `method` member has already been read as `method`.
    pub fn normalize(
        &self,
        method: &str,
        request: &Map<String, Value>,
    ) -> Result<CanonicalCall, NormalizeError> {
        if method == LEGACY_CALL {
            self.legacy(request.get("params"))
        } else {
            self.dotted(method, request.get("params"))
        }
    }

    fn legacy(&self, params: Option<&Value>) -> Result<CanonicalCall, NormalizeError> {
        let params = params.ok_or(NormalizeError::NoParams)?;
        let items = match params {
            Value::Array(items) => items.as_slice(),
            other => return Err(NormalizeError::InvalidArity(describe(other))),
        };
        let default = self.default_network;

        match items {
            [api, method] => Ok(CanonicalCall::new(
                default,
                name(api, 0)?,
                name(method, 1)?,
                empty_args(),
            )),
            [network, api, method, args] => Ok(CanonicalCall::new(
                name(network, 0)?,
                name(api, 1)?,
                name(method, 2)?,
                args.clone(),
            )),
            [first, second, third @ Value::String(last)] => {
                let (first, second) = (name(first, 0)?, name(second, 1)?);
                if self.registry.try_lookup(first, second, last).is_some() {
                    Ok(CanonicalCall::new(first, second, last, empty_args()))
                } else {
                    Ok(CanonicalCall::new(default, first, second, third.clone()))
                }
            }
            [api, method, args] => Ok(CanonicalCall::new(
                default,
                name(api, 0)?,
                name(method, 1)?,
                args.clone(),
            )),
            _ => Err(NormalizeError::InvalidArity(format!(
                "{} elements",
                items.len()
            ))),
        }
    }

    fn dotted(&self, method: &str, params: Option<&Value>) -> Result<CanonicalCall, NormalizeError> {
        // Empty segments are kept; they fail later as an unknown api or method.
        let segments: Vec<&str> = method.split('.').collect();
        let args = params.cloned().unwrap_or_else(empty_args);

        match segments.as_slice() {
            [api, method] => {
                let network = match args.get("network_id") {
                    None => self.default_network.to_string(),
                    Some(Value::String(network)) => network.clone(),
                    Some(_) => return Err(NormalizeError::InvalidNetworkId),
                };
                Ok(CanonicalCall::new(&network, api, method, args))
            }
            [network, api, method] => Ok(CanonicalCall::new(network, api, method, args)),
            _ => Err(NormalizeError::InvalidMethodSpec(method.to_string())),
        }
    }
}

fn name(value: &Value, index: usize) -> Result<&str, NormalizeError> {
    value.as_str().ok_or(NormalizeError::NotAString(index))
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".into(),
        Value::Bool(_) => "a boolean".into(),
        Value::Number(_) => "a number".into(),
        Value::String(_) => "a string".into(),
        Value::Array(items) => format!("{} elements", items.len()),
        Value::Object(_) => "an object".into(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler;
    use chainrpc_api::Signature;
    use serde_json::json;

    fn registry() -> MethodRegistry {
        let r = MethodRegistry::new();
        r.register(
            "mainnet",
            "chain",
            "get_state",
            handler(|_, _| Ok(json!(null))),
            Signature::default(),
        );
        r
    }

    fn request(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn normalize(r: &MethodRegistry, value: Value) -> Result<CanonicalCall, NormalizeError> {
        let req = request(value);
        let method = req["method"].as_str().unwrap().to_string();
        Normalizer::new("devnet", r).normalize(&method, &req)
    }

    #[test]
    fn legacy_two_elements_use_default_network() {
        let r = registry();
        let call = normalize(&r, json!({ "method": "call", "params": ["chain", "ping"] })).unwrap();
        assert_eq!(call, CanonicalCall::new("devnet", "chain", "ping", json!({})));
    }

    #[test]
    fn legacy_four_elements_are_taken_verbatim() {
        let r = registry();
        let call = normalize(
            &r,
            json!({ "method": "call", "params": ["testnet", "chain", "ping", [1, 2]] }),
        )
        .unwrap();
        assert_eq!(call, CanonicalCall::new("testnet", "chain", "ping", json!([1, 2])));
    }

    #[test]
    fn legacy_three_strings_prefer_registered_network_form() {
        let r = registry();
        let call = normalize(
            &r,
            json!({ "method": "call", "params": ["mainnet", "chain", "get_state"] }),
        )
        .unwrap();
        assert_eq!(call, CanonicalCall::new("mainnet", "chain", "get_state", json!({})));
    }

    #[test]
    fn legacy_three_strings_fall_back_to_api_method_args() {
        let r = registry();
        let call = normalize(
            &r,
            json!({ "method": "call", "params": ["chain", "get_block", "latest"] }),
        )
        .unwrap();
        assert_eq!(
            call,
            CanonicalCall::new("devnet", "chain", "get_block", json!("latest"))
        );
    }

    #[test]
    fn legacy_three_elements_with_object_args() {
        let r = registry();
        let call = normalize(
            &r,
            json!({ "method": "call", "params": ["chain", "get_state", { "x": 1 }] }),
        )
        .unwrap();
        assert_eq!(
            call,
            CanonicalCall::new("devnet", "chain", "get_state", json!({ "x": 1 }))
        );
    }

    #[test]
    fn legacy_without_params_is_no_params() {
        let r = registry();
        assert_eq!(
            normalize(&r, json!({ "method": "call" })).unwrap_err(),
            NormalizeError::NoParams
        );
    }

    #[test]
    fn legacy_bad_arity_is_rejected() {
        let r = registry();
        for params in [json!([]), json!(["a"]), json!(["a", "b", "c", {}, 5]), json!({})] {
            let err = normalize(&r, json!({ "method": "call", "params": params })).unwrap_err();
            assert!(matches!(err, NormalizeError::InvalidArity(_)), "{err:?}");
            assert_eq!(err.kind(), "invalid_params");
        }
    }

    #[test]
    fn legacy_names_must_be_strings() {
        let r = registry();
        assert_eq!(
            normalize(&r, json!({ "method": "call", "params": [1, "ping"] })).unwrap_err(),
            NormalizeError::NotAString(0)
        );
    }

    #[test]
    fn dotted_two_segments_default_and_params() {
        let r = registry();
        let call = normalize(&r, json!({ "method": "chain.ping" })).unwrap();
        assert_eq!(call, CanonicalCall::new("devnet", "chain", "ping", json!({})));

        let call = normalize(&r, json!({ "method": "chain.ping", "params": [1] })).unwrap();
        assert_eq!(call.args, json!([1]));
    }

    #[test]
    fn dotted_network_id_overrides_network() {
        let r = registry();
        let call = normalize(
            &r,
            json!({ "method": "chain.ping", "params": { "network_id": "testnet", "n": 2 } }),
        )
        .unwrap();
        assert_eq!(call.network, "testnet");
        assert_eq!(call.args, json!({ "network_id": "testnet", "n": 2 }));

        let err = normalize(
            &r,
            json!({ "method": "chain.ping", "params": { "network_id": 5 } }),
        )
        .unwrap_err();
        assert_eq!(err, NormalizeError::InvalidNetworkId);
    }

    #[test]
    fn dotted_three_segments_name_the_network() {
        let r = registry();
        let call = normalize(&r, json!({ "method": "testnet.chain.ping" })).unwrap();
        assert_eq!(call, CanonicalCall::new("testnet", "chain", "ping", json!({})));
    }

    #[test]
    fn bad_segment_counts_are_invalid_requests() {
        let r = registry();
        for method in ["ping", "a.b.c.d", ""] {
            let err = normalize(&r, json!({ "method": method })).unwrap_err();
            assert!(matches!(err, NormalizeError::InvalidMethodSpec(_)), "{method}");
            assert_eq!(err.kind(), "invalid_request");
        }
    }

    #[test]
    fn empty_segments_are_routed_for_lookup() {
        let r = registry();
        let call = normalize(&r, json!({ "method": "chain." })).unwrap();
        assert_eq!(call, CanonicalCall::new("devnet", "chain", "", json!({})));

        let call = normalize(&r, json!({ "method": ".ping" })).unwrap();
        assert_eq!(call, CanonicalCall::new("devnet", "", "ping", json!({})));
    }
}
