//! Method signatures returned by `jsonrpc.get_signature`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structural description of a method's argument and return shapes.
///
/// Purely descriptive: the engine never validates calls against it. Plugins
/// usually fill both members with an example value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Signature {
    pub args: Value,
    pub ret: Value,
}

impl Signature {
    pub fn new(args: Value, ret: Value) -> Self {
        Self { args, ret }
    }
}
