//! Behavior Tree runtime built on `rts-ai-core`.
//!
//! Composites resume at their running child instead of restarting from the root, so a
//! multi-tick action keeps its place until it resolves. Every outcome is a [`Status`]; nothing
//! reachable from [`BtNode::execute`] panics or returns an error.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod bt;
pub mod context;
pub mod error;
pub mod leaves;
pub mod nodes;
pub mod tree;

pub use bt::{BtNode, NodeCore, NodeId, Status};
pub use context::{keys, ContextMap, NodeContext};
pub use error::SnapshotError;
pub use nodes::{
    Action, ActionNode, Condition, Decorator, FnAction, Inverter, Repeater, Selector, Sequence,
    StatusMap,
};
pub use tree::{NodeSnapshot, Tree, TreeSnapshot, TreeStats};
