use std::borrow::Cow;

use crate::bt::{BtNode, NodeCore, Status};
use crate::context::NodeContext;

/// A cursor that no longer points at a child (children were removed mid-run) restarts at 0.
fn checked_cursor(core: &NodeCore, cursor: usize, len: usize) -> usize {
    if cursor != 0 && cursor >= len {
        tracing::warn!(
            node = %core.name(),
            cursor,
            children = len,
            "composite cursor out of range; restarting from first child"
        );
        return 0;
    }
    cursor
}

/// Runs children left to right until one fails.
///
/// A running child suspends the sequence; the next execution resumes at that child without
/// re-running the ones before it.
pub struct Sequence {
    core: NodeCore,
    children: Vec<Box<dyn BtNode>>,
    index: usize,
}

impl Sequence {
    pub fn new(name: impl Into<Cow<'static, str>>, children: Vec<Box<dyn BtNode>>) -> Self {
        Self {
            core: NodeCore::new(name),
            children,
            index: 0,
        }
    }

    pub fn current_child_index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn push_child(&mut self, child: Box<dyn BtNode>) {
        self.children.push(child);
    }

    /// Structural edit for tooling. The cursor is validated on the next execution.
    pub fn remove_child(&mut self, index: usize) -> Option<Box<dyn BtNode>> {
        (index < self.children.len()).then(|| self.children.remove(index))
    }
}

impl BtNode for Sequence {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn tick(&mut self, ctx: &mut NodeContext<'_>) -> Status {
        self.index = checked_cursor(&self.core, self.index, self.children.len());
        while self.index < self.children.len() {
            match self.children[self.index].execute(ctx) {
                Status::Running => return Status::Running,
                Status::Failure => {
                    self.index = 0;
                    return Status::Failure;
                }
                Status::Success => self.index += 1,
            }
        }

        self.index = 0;
        Status::Success
    }

    fn children(&self) -> &[Box<dyn BtNode>] {
        &self.children
    }

    fn children_mut(&mut self) -> &mut [Box<dyn BtNode>] {
        &mut self.children
    }

    fn on_reset(&mut self) {
        self.index = 0;
    }

    fn progress(&self) -> Option<i64> {
        Some(self.index as i64)
    }

    fn restore_progress(&mut self, progress: i64) {
        self.index = usize::try_from(progress).unwrap_or(0);
    }
}

/// Tries children left to right until one succeeds. Resumes a running child like [`Sequence`].
pub struct Selector {
    core: NodeCore,
    children: Vec<Box<dyn BtNode>>,
    index: usize,
}

impl Selector {
    pub fn new(name: impl Into<Cow<'static, str>>, children: Vec<Box<dyn BtNode>>) -> Self {
        Self {
            core: NodeCore::new(name),
            children,
            index: 0,
        }
    }

    pub fn current_child_index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn push_child(&mut self, child: Box<dyn BtNode>) {
        self.children.push(child);
    }

    pub fn remove_child(&mut self, index: usize) -> Option<Box<dyn BtNode>> {
        (index < self.children.len()).then(|| self.children.remove(index))
    }
}

impl BtNode for Selector {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn tick(&mut self, ctx: &mut NodeContext<'_>) -> Status {
        self.index = checked_cursor(&self.core, self.index, self.children.len());
        while self.index < self.children.len() {
            match self.children[self.index].execute(ctx) {
                Status::Running => return Status::Running,
                Status::Success => {
                    self.index = 0;
                    return Status::Success;
                }
                Status::Failure => self.index += 1,
            }
        }

        self.index = 0;
        Status::Failure
    }

    fn children(&self) -> &[Box<dyn BtNode>] {
        &self.children
    }

    fn children_mut(&mut self) -> &mut [Box<dyn BtNode>] {
        &mut self.children
    }

    fn on_reset(&mut self) {
        self.index = 0;
    }

    fn progress(&self) -> Option<i64> {
        Some(self.index as i64)
    }

    fn restore_progress(&mut self, progress: i64) {
        self.index = usize::try_from(progress).unwrap_or(0);
    }
}
