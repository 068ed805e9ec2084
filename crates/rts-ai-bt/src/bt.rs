use std::borrow::Cow;

use rts_ai_core::{split_seed, SplitMix64};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::context::NodeContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum Status {
    Running,
    Success,
    Failure,
}

impl Status {
    pub fn is_done(self) -> bool {
        self != Status::Running
    }

    /// Stable numeric code for trace payloads.
    pub fn code(self) -> u64 {
        match self {
            Status::Running => 0,
            Status::Success => 1,
            Status::Failure => 2,
        }
    }

    pub fn from_bool(ok: bool) -> Self {
        if ok {
            Status::Success
        } else {
            Status::Failure
        }
    }
}

/// Depth-first position of a node inside its tree. Assigned by [`crate::Tree::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeId(pub u32);

/// State shared by every node kind.
#[derive(Debug, Clone)]
pub struct NodeCore {
    name: Cow<'static, str>,
    id: Option<NodeId>,
    parent: Option<NodeId>,
    executions: u64,
    running: bool,
    seed: u64,
    pub(crate) rng: SplitMix64,
}

impl NodeCore {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            id: None,
            parent: None,
            executions: 0,
            running: false,
            seed: 0,
            rng: SplitMix64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> Option<NodeId> {
        self.id
    }

    /// Non-owning back reference; resolve it through the owning tree.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn executions(&self) -> u64 {
        self.executions
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn rng_state(&self) -> u64 {
        self.rng.state()
    }

    pub(crate) fn link(&mut self, id: NodeId, parent: Option<NodeId>) {
        self.id = Some(id);
        self.parent = parent;
    }

    pub(crate) fn restore(&mut self, executions: u64, running: bool, seed: u64, rng_state: u64) {
        self.executions = executions;
        self.running = running;
        self.seed = seed;
        self.rng = SplitMix64::from_state(rng_state);
    }
}

/// An executable behavior-tree node.
///
/// Implementors provide [`BtNode::tick`] plus access to their [`NodeCore`]; the lifecycle
/// (`execute`, `interrupt`, `reset`, `initialize`) is provided and recurses through
/// [`BtNode::children_mut`]. Nothing reachable from `execute` may panic: every outcome is a
/// [`Status`].
pub trait BtNode: 'static {
    fn core(&self) -> &NodeCore;
    fn core_mut(&mut self) -> &mut NodeCore;

    /// Node-specific evaluation. Call [`BtNode::execute`] instead of this from parents.
    fn tick(&mut self, ctx: &mut NodeContext<'_>) -> Status;

    fn children(&self) -> &[Box<dyn BtNode>] {
        &[]
    }

    fn children_mut(&mut self) -> &mut [Box<dyn BtNode>] {
        &mut []
    }

    /// Clear node-local progress (cursors, counters). Children are handled by `reset`.
    fn on_reset(&mut self) {}

    /// Cancel hook for in-flight work. Called before `on_reset` when a running node is halted.
    fn on_interrupt(&mut self) {}

    /// Resumable progress marker captured in snapshots (cursor, iteration, remaining ticks).
    fn progress(&self) -> Option<i64> {
        None
    }

    fn restore_progress(&mut self, _progress: i64) {}

    fn name(&self) -> &str {
        self.core().name()
    }

    fn is_running(&self) -> bool {
        self.core().is_running()
    }

    fn execute(&mut self, ctx: &mut NodeContext<'_>) -> Status {
        // Leaves draw from their own stream while they run; the caller's is restored afterwards.
        let outer = std::mem::replace(&mut ctx.node_rng, self.core().rng);
        let status = self.tick(ctx);
        let core = self.core_mut();
        core.rng = std::mem::replace(&mut ctx.node_rng, outer);
        core.executions = core.executions.saturating_add(1);
        core.running = status == Status::Running;
        tracing::trace!(node = %core.name, ?status, "node executed");
        status
    }

    /// Halt a running node without normal completion. No-op when idle.
    fn interrupt(&mut self) {
        if !self.core().is_running() {
            return;
        }
        for child in self.children_mut() {
            child.interrupt();
        }
        self.on_interrupt();
        self.on_reset();
        self.core_mut().running = false;
        tracing::trace!(node = %self.name(), "node interrupted");
    }

    fn reset(&mut self) {
        for child in self.children_mut() {
            child.reset();
        }
        self.on_reset();
        self.core_mut().running = false;
    }

    /// Seed this node and, recursively, every child with a split stream.
    fn initialize(&mut self, seed: u64) {
        {
            let core = self.core_mut();
            core.seed = seed;
            core.rng = SplitMix64::new(seed);
        }
        for (i, child) in self.children_mut().iter_mut().enumerate() {
            child.initialize(split_seed(seed, i as u64));
        }
    }
}
