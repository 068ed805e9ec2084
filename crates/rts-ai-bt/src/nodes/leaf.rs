use std::borrow::Cow;

use crate::bt::{BtNode, NodeCore, Status};
use crate::context::NodeContext;

/// Pure predicate leaf: never `Running`, never writes.
pub struct Condition<F> {
    core: NodeCore,
    cond: F,
}

impl<F> Condition<F>
where
    F: FnMut(&NodeContext<'_>) -> bool + 'static,
{
    pub fn new(name: impl Into<Cow<'static, str>>, cond: F) -> Self {
        Self {
            core: NodeCore::new(name),
            cond,
        }
    }
}

impl<F> BtNode for Condition<F>
where
    F: FnMut(&NodeContext<'_>) -> bool + 'static,
{
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn tick(&mut self, ctx: &mut NodeContext<'_>) -> Status {
        Status::from_bool((self.cond)(&*ctx))
    }
}

/// Side-effecting decision logic hosted by an [`ActionNode`]. May span several ticks.
pub trait Action: 'static {
    fn tick(&mut self, ctx: &mut NodeContext<'_>) -> Status;

    /// Cancel in-flight work; called only while the action is running.
    fn interrupt(&mut self) {}

    fn reset(&mut self) {}

    fn progress(&self) -> Option<i64> {
        None
    }

    fn restore_progress(&mut self, _progress: i64) {}
}

/// Closure-backed [`Action`] without interrupt or progress hooks.
pub struct FnAction<F>(pub F);

impl<F> Action for FnAction<F>
where
    F: FnMut(&mut NodeContext<'_>) -> Status + 'static,
{
    fn tick(&mut self, ctx: &mut NodeContext<'_>) -> Status {
        (self.0)(ctx)
    }
}

pub struct ActionNode {
    core: NodeCore,
    action: Box<dyn Action>,
}

impl ActionNode {
    pub fn new(name: impl Into<Cow<'static, str>>, action: impl Action) -> Self {
        Self {
            core: NodeCore::new(name),
            action: Box::new(action),
        }
    }

    pub fn from_fn<F>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: FnMut(&mut NodeContext<'_>) -> Status + 'static,
    {
        Self::new(name, FnAction(f))
    }
}

impl BtNode for ActionNode {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn tick(&mut self, ctx: &mut NodeContext<'_>) -> Status {
        self.action.tick(ctx)
    }

    fn on_interrupt(&mut self) {
        self.action.interrupt();
    }

    fn on_reset(&mut self) {
        self.action.reset();
    }

    fn progress(&self) -> Option<i64> {
        self.action.progress()
    }

    fn restore_progress(&mut self, progress: i64) {
        self.action.restore_progress(progress);
    }
}
