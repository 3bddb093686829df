//! The built-in `node` api.
//!
//! | Method | Args | Result |
//! |--------|------|--------|
//! | `node.ping` | ignored | `"pong"` |
//! | `node.get_info` | ignored | version, default network, served networks |
//! | `node.add` | `[a, b]` | `a + b` |
//! | `node.echo` | anything | the args, unchanged |
//! | `node.watch` | `{"count": n, "value": v}` | subscription id; `n` notices pushed first |

use chainrpc::{handler, typed, ApiPlugin, ApiRegistrar, CallContext, CallError, Signature};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Api namespace of this plugin.
pub const NODE_API: &str = "node";

/// Upper bound on notices a single `node.watch` call may push.
pub const MAX_WATCH_COUNT: u32 = 100;

#[derive(Debug, Default)]
pub struct NodeApi;

#[derive(Debug, Serialize)]
struct NodeInfo {
    version: &'static str,
    default_network: String,
    networks: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WatchArgs {
    count: u32,
    #[serde(default)]
    value: Value,
}

impl ApiPlugin for NodeApi {
    fn api_name(&self) -> &str {
        NODE_API
    }

    fn register(&self, api: &mut ApiRegistrar<'_>) {
        api.method(
            "ping",
            Signature::new(json!({}), json!("pong")),
            handler(|_, _| Ok(json!("pong"))),
        )
        .read_method(
            "get_info",
            Signature::new(
                json!({}),
                json!({ "version": "", "default_network": "", "networks": [] }),
            ),
            typed(get_info),
        )
        .method(
            "add",
            Signature::new(json!([0, 0]), json!(0)),
            typed(|(a, b): (i64, i64), _| {
                a.checked_add(b)
                    .ok_or_else(|| CallError::failed("integer overflow"))
            }),
        )
        .method(
            "echo",
            Signature::new(json!({}), json!({})),
            handler(|args, _| Ok(args)),
        )
        .method(
            "watch",
            Signature::new(json!({ "count": 0, "value": null }), json!(0)),
            typed(watch),
        );
    }
}

fn get_info(_args: Value, ctx: &CallContext<'_>) -> Result<NodeInfo, CallError> {
    Ok(NodeInfo {
        version: env!("CARGO_PKG_VERSION"),
        default_network: ctx.default_network(),
        networks: ctx.registry().networks(),
    })
}

fn watch(args: WatchArgs, ctx: &CallContext<'_>) -> Result<u64, CallError> {
    if args.count > MAX_WATCH_COUNT {
        return Err(CallError::InvalidArgs(format!(
            "count must not exceed {MAX_WATCH_COUNT}"
        )));
    }
    let subscription_id = ctx.generate_subscription_id();
    for seq in 0..args.count {
        // Undelivered notices are logged by the context and dropped.
        ctx.notify(subscription_id, json!({ "seq": seq, "value": args.value }))
            .ok();
    }
    Ok(subscription_id)
}
