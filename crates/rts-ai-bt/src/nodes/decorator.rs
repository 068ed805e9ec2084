use std::borrow::Cow;

use crate::bt::{BtNode, NodeCore, Status};
use crate::context::NodeContext;

/// How a [`Decorator`] rewrites its child's result. `Running` is never rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusMap {
    Passthrough,
    ForceSuccess,
    ForceFailure,
}

impl StatusMap {
    fn apply(self, status: Status) -> Status {
        match (self, status) {
            (_, Status::Running) => Status::Running,
            (StatusMap::Passthrough, s) => s,
            (StatusMap::ForceSuccess, _) => Status::Success,
            (StatusMap::ForceFailure, _) => Status::Failure,
        }
    }
}

/// Single-child wrapper. Invokes its child exactly once per execution.
pub struct Decorator {
    core: NodeCore,
    child: Box<dyn BtNode>,
    map: StatusMap,
}

impl Decorator {
    pub fn new(name: impl Into<Cow<'static, str>>, child: Box<dyn BtNode>, map: StatusMap) -> Self {
        Self {
            core: NodeCore::new(name),
            child,
            map,
        }
    }

    pub fn passthrough(name: impl Into<Cow<'static, str>>, child: Box<dyn BtNode>) -> Self {
        Self::new(name, child, StatusMap::Passthrough)
    }

    pub fn child(&self) -> &dyn BtNode {
        self.child.as_ref()
    }
}

impl BtNode for Decorator {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn tick(&mut self, ctx: &mut NodeContext<'_>) -> Status {
        self.map.apply(self.child.execute(ctx))
    }

    fn children(&self) -> &[Box<dyn BtNode>] {
        std::slice::from_ref(&self.child)
    }

    fn children_mut(&mut self) -> &mut [Box<dyn BtNode>] {
        std::slice::from_mut(&mut self.child)
    }
}

/// Swaps `Success` and `Failure`.
pub struct Inverter {
    core: NodeCore,
    child: Box<dyn BtNode>,
}

impl Inverter {
    pub fn new(name: impl Into<Cow<'static, str>>, child: Box<dyn BtNode>) -> Self {
        Self {
            core: NodeCore::new(name),
            child,
        }
    }
}

impl BtNode for Inverter {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn tick(&mut self, ctx: &mut NodeContext<'_>) -> Status {
        match self.child.execute(ctx) {
            Status::Success => Status::Failure,
            Status::Failure => Status::Success,
            Status::Running => Status::Running,
        }
    }

    fn children(&self) -> &[Box<dyn BtNode>] {
        std::slice::from_ref(&self.child)
    }

    fn children_mut(&mut self) -> &mut [Box<dyn BtNode>] {
        std::slice::from_mut(&mut self.child)
    }
}

/// Drives its child to completion `repeat_count` times (forever when negative).
///
/// Each execution invokes the child once. A completed iteration resets the child and reports
/// `Running` until the last one, which reports `Success`. A child failure aborts with `Failure`
/// and clears the iteration counter, unless `ignore_failure` is set, in which case it counts as
/// a completed iteration. A `repeat_count` of 0 behaves like 1: the child always runs.
pub struct Repeater {
    core: NodeCore,
    child: Box<dyn BtNode>,
    repeat_count: i32,
    ignore_failure: bool,
    iteration: u32,
}

impl Repeater {
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        child: Box<dyn BtNode>,
        repeat_count: i32,
        ignore_failure: bool,
    ) -> Self {
        Self {
            core: NodeCore::new(name),
            child,
            repeat_count,
            ignore_failure,
            iteration: 0,
        }
    }

    pub fn forever(name: impl Into<Cow<'static, str>>, child: Box<dyn BtNode>) -> Self {
        Self::new(name, child, -1, false)
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    fn target(&self) -> Option<u32> {
        (self.repeat_count >= 0).then(|| self.repeat_count.max(1) as u32)
    }
}

impl BtNode for Repeater {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn tick(&mut self, ctx: &mut NodeContext<'_>) -> Status {
        match self.child.execute(ctx) {
            Status::Running => Status::Running,
            Status::Failure if !self.ignore_failure => {
                self.iteration = 0;
                self.child.reset();
                Status::Failure
            }
            Status::Success | Status::Failure => {
                self.iteration = self.iteration.saturating_add(1);
                self.child.reset();
                match self.target() {
                    Some(target) if self.iteration >= target => {
                        self.iteration = 0;
                        Status::Success
                    }
                    _ => Status::Running,
                }
            }
        }
    }

    fn children(&self) -> &[Box<dyn BtNode>] {
        std::slice::from_ref(&self.child)
    }

    fn children_mut(&mut self) -> &mut [Box<dyn BtNode>] {
        std::slice::from_mut(&mut self.child)
    }

    fn on_reset(&mut self) {
        self.iteration = 0;
    }

    fn progress(&self) -> Option<i64> {
        Some(self.iteration as i64)
    }

    fn restore_progress(&mut self, progress: i64) {
        self.iteration = u32::try_from(progress).unwrap_or(0);
    }
}
