use std::fmt;
use std::time::{Duration, Instant};

use rts_ai_core::{AgentRef, SplitMix64, TickContext, World};
use rts_ai_tools::{emit, TraceEvent, TraceSink};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bt::{BtNode, NodeId, Status};
use crate::context::{ContextMap, NodeContext};
use crate::error::SnapshotError;

/// Outcome counters of [`Tree::execute`] calls that actually ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TreeStats {
    pub total: u64,
    pub successes: u64,
    pub failures: u64,
    pub running: u64,
}

impl TreeStats {
    fn record(&mut self, status: Status) {
        self.total = self.total.saturating_add(1);
        let slot = match status {
            Status::Success => &mut self.successes,
            Status::Failure => &mut self.failures,
            Status::Running => &mut self.running,
        };
        *slot = slot.saturating_add(1);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeSnapshot {
    pub id: u32,
    pub name: String,
    pub executions: u64,
    pub running: bool,
    pub seed: u64,
    pub rng_state: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub progress: Option<i64>,
}

/// Full runtime state of a [`Tree`]; nodes are listed depth-first.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TreeSnapshot {
    pub tree_type: String,
    pub seed: u64,
    pub stats: TreeStats,
    pub last_status: Status,
    pub paused: bool,
    pub context: ContextMap,
    pub nodes: Vec<NodeSnapshot>,
}

/// A root node plus the scratch context and telemetry of one agent's evaluations.
pub struct Tree {
    tree_type: String,
    root: Box<dyn BtNode>,
    context: ContextMap,
    seed: u64,
    stats: TreeStats,
    last_status: Status,
    paused: bool,
    node_count: usize,
    trace: Option<Box<dyn TraceSink>>,
    last_duration: Duration,
}

impl Tree {
    /// Takes ownership of `root` and assigns depth-first [`NodeId`]s and parent links.
    pub fn new(tree_type: impl Into<String>, mut root: Box<dyn BtNode>) -> Self {
        let mut next = 0;
        link(root.as_mut(), None, &mut next);
        Self {
            tree_type: tree_type.into(),
            root,
            context: ContextMap::new(),
            seed: 0,
            stats: TreeStats::default(),
            last_status: Status::Running,
            paused: false,
            node_count: next as usize,
            trace: None,
            last_duration: Duration::ZERO,
        }
    }

    pub fn with_seed(tree_type: impl Into<String>, root: Box<dyn BtNode>, seed: u64) -> Self {
        let mut tree = Self::new(tree_type, root);
        tree.initialize(seed);
        tree
    }

    pub fn tree_type(&self) -> &str {
        &self.tree_type
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn root(&self) -> &dyn BtNode {
        self.root.as_ref()
    }

    pub fn root_mut(&mut self) -> &mut dyn BtNode {
        self.root.as_mut()
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Resolve a node id (e.g. a [`crate::NodeCore::parent`] link).
    pub fn node(&self, id: NodeId) -> Option<&dyn BtNode> {
        find(self.root.as_ref(), id)
    }

    pub fn context(&self) -> &ContextMap {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ContextMap {
        &mut self.context
    }

    pub fn stats(&self) -> TreeStats {
        self.stats
    }

    pub fn last_status(&self) -> Status {
        self.last_status
    }

    pub fn last_duration(&self) -> Duration {
        self.last_duration
    }

    pub fn set_trace_sink(&mut self, sink: Option<Box<dyn TraceSink>>) {
        self.trace = sink;
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Run the root once against the current context.
    ///
    /// A paused tree does not touch any node and reports the previously recorded status.
    pub fn execute(
        &mut self,
        tick: TickContext,
        agent: AgentRef,
        rng: &mut SplitMix64,
        world: &mut dyn World,
    ) -> Status {
        if self.paused {
            tracing::trace!(tree = %self.tree_type, unit = agent.unit, "tree paused; skipping");
            return self.last_status;
        }

        let start = Instant::now();
        let status = {
            let mut ctx = NodeContext::new(tick, agent, &mut self.context, rng, world);
            self.root.execute(&mut ctx)
        };
        self.last_duration = start.elapsed();
        self.last_status = status;
        self.stats.record(status);

        emit(
            self.trace.as_deref_mut(),
            TraceEvent::new(tick.tick, "bt.tree.execute")
                .with_agent(agent.unit)
                .with_a(status.code())
                .with_b(self.stats.total),
        );
        tracing::debug!(
            tree = %self.tree_type,
            unit = agent.unit,
            tick = tick.tick,
            ?status,
            elapsed_us = self.last_duration.as_micros() as u64,
            "tree executed"
        );
        status
    }

    pub fn interrupt(&mut self) {
        self.root.interrupt();
    }

    /// Node-local reset; the context and counters are kept.
    pub fn reset(&mut self) {
        self.root.reset();
    }

    pub fn initialize(&mut self, seed: u64) {
        self.seed = seed;
        self.root.initialize(seed);
    }

    pub fn snapshot(&self) -> TreeSnapshot {
        let mut nodes = Vec::with_capacity(self.node_count);
        collect(self.root.as_ref(), &mut nodes);
        TreeSnapshot {
            tree_type: self.tree_type.clone(),
            seed: self.seed,
            stats: self.stats,
            last_status: self.last_status,
            paused: self.paused,
            context: self.context.clone(),
            nodes,
        }
    }

    /// Restore state captured by [`Tree::snapshot`] into a tree of the same shape.
    ///
    /// The snapshot is validated in full before anything is written.
    pub fn restore(&mut self, snapshot: TreeSnapshot) -> Result<(), SnapshotError> {
        if snapshot.tree_type != self.tree_type {
            return Err(SnapshotError::TreeTypeMismatch {
                expected: self.tree_type.clone(),
                found: snapshot.tree_type,
            });
        }
        if snapshot.nodes.len() != self.node_count {
            return Err(SnapshotError::ShapeMismatch {
                expected: self.node_count,
                found: snapshot.nodes.len(),
            });
        }

        let mut current = Vec::with_capacity(self.node_count);
        collect(self.root.as_ref(), &mut current);
        for (index, (have, want)) in current.iter().zip(&snapshot.nodes).enumerate() {
            if have.name != want.name {
                return Err(SnapshotError::NodeMismatch {
                    index,
                    expected: have.name.clone(),
                    found: want.name.clone(),
                });
            }
        }

        let mut index = 0;
        apply(self.root.as_mut(), &snapshot.nodes, &mut index);
        self.seed = snapshot.seed;
        self.stats = snapshot.stats;
        self.last_status = snapshot.last_status;
        self.paused = snapshot.paused;
        self.context = snapshot.context;
        Ok(())
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("tree_type", &self.tree_type)
            .field("root", &self.root.name())
            .field("seed", &self.seed)
            .field("stats", &self.stats)
            .field("last_status", &self.last_status)
            .field("paused", &self.paused)
            .field("node_count", &self.node_count)
            .finish_non_exhaustive()
    }
}

fn link(node: &mut dyn BtNode, parent: Option<NodeId>, next: &mut u32) {
    let id = NodeId(*next);
    *next += 1;
    node.core_mut().link(id, parent);
    for child in node.children_mut() {
        link(child.as_mut(), Some(id), next);
    }
}

fn find(node: &dyn BtNode, id: NodeId) -> Option<&dyn BtNode> {
    if node.core().id() == Some(id) {
        return Some(node);
    }
    node.children().iter().find_map(|child| find(child.as_ref(), id))
}

fn collect(node: &dyn BtNode, out: &mut Vec<NodeSnapshot>) {
    let core = node.core();
    out.push(NodeSnapshot {
        id: core.id().map_or(0, |id| id.0),
        name: core.name().to_owned(),
        executions: core.executions(),
        running: core.is_running(),
        seed: core.seed(),
        rng_state: core.rng_state(),
        progress: node.progress(),
    });
    for child in node.children() {
        collect(child.as_ref(), out);
    }
}

fn apply(node: &mut dyn BtNode, nodes: &[NodeSnapshot], index: &mut usize) {
    let Some(snap) = nodes.get(*index) else {
        return;
    };
    *index += 1;
    node.core_mut()
        .restore(snap.executions, snap.running, snap.seed, snap.rng_state);
    match snap.progress {
        Some(progress) => node.restore_progress(progress),
        None => node.on_reset(),
    }
    for child in node.children_mut() {
        apply(child.as_mut(), nodes, index);
    }
}
