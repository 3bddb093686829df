//! Wire types for the chainrpc JSON-RPC 2.0 endpoint.
//!
//! This crate encodes everything a client can observe on the wire as plain
//! serde types. It has no I/O and no knowledge of handlers or the registry;
//! the `chainrpc` engine and the `chainrpc-node` host both build on it.
//!
//! # Messages covered
//!
//! | Direction | Shape | Type |
//! |-----------|-------|------|
//! | server → client | `{"jsonrpc","result"\|"error","id"}` | [`RpcResponse`] |
//! | server → client | `{"code","message","data"}` | [`RpcError`] |
//! | server → client (push) | `{"jsonrpc","method":"notice","params":[id,[value]]}` | [`Notice`] |
//! | introspection result | `{"args","ret"}` | [`Signature`] |
//!
//! Error codes live in [`codes`].

pub mod error;
pub mod notice;
pub mod response;
pub mod signature;

pub use error::{codes, RpcError};
pub use notice::Notice;
pub use response::{RequestId, RpcResponse, JSONRPC_VERSION};
pub use signature::Signature;
