//! Api plugins served by this node.

pub mod node;

pub use node::NodeApi;
