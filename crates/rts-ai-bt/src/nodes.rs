//! Node kinds: composites (with a resumable cursor), decorators (one child) and leaves.

pub mod composite;
pub mod decorator;
pub mod leaf;

pub use composite::{Selector, Sequence};
pub use decorator::{Decorator, Inverter, Repeater, StatusMap};
pub use leaf::{Action, ActionNode, Condition, FnAction};
