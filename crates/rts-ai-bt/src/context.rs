use std::collections::BTreeMap;

use rts_ai_core::{
    Actuation, AgentRef, BbType, BbValue, FactionId, Perception, SplitMix64, TacticalQueries,
    TickContext, UnitId, World,
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Conventional context keys shared by the standard leaves and the agent wrapper.
pub mod keys {
    /// The decision a tree produced this evaluation.
    pub const ACTION: &str = "action";
    pub const TARGET_ID: &str = "target_id";
    pub const TARGET_POS: &str = "target_pos";
    /// Destination consumed by `MoveTo`.
    pub const MOVE_POS: &str = "move_pos";
    pub const PATROL_INDEX: &str = "patrol_index";
}

/// Per-evaluation scratch map owned by a [`crate::Tree`].
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct ContextMap {
    values: BTreeMap<String, BbValue>,
}

impl ContextMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&BbValue> {
        self.values.get(key)
    }

    pub fn get_as<T: BbType>(&self, key: &str) -> Option<T> {
        self.values.get(key).and_then(T::from_value)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<BbValue>) -> Option<BbValue> {
        self.values.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<BbValue> {
        self.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BbValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Extend<(String, BbValue)> for ContextMap {
    fn extend<I: IntoIterator<Item = (String, BbValue)>>(&mut self, iter: I) {
        self.values.extend(iter);
    }
}

/// Everything a node sees while it executes.
pub struct NodeContext<'a> {
    pub tick: TickContext,
    pub agent: AgentRef,
    pub vars: &'a mut ContextMap,
    /// Gameplay stream owned by the agent wrapper; reproducible under replay.
    pub rng: &'a mut SplitMix64,
    /// Stream of the node currently executing (swapped in by `BtNode::execute`).
    pub node_rng: SplitMix64,
    world: &'a mut dyn World,
}

impl<'a> NodeContext<'a> {
    pub fn new(
        tick: TickContext,
        agent: AgentRef,
        vars: &'a mut ContextMap,
        rng: &'a mut SplitMix64,
        world: &'a mut dyn World,
    ) -> Self {
        Self {
            tick,
            agent,
            vars,
            rng,
            node_rng: SplitMix64::default(),
            world,
        }
    }

    pub fn unit(&self) -> UnitId {
        self.agent.unit
    }

    pub fn faction(&self) -> FactionId {
        self.agent.faction
    }

    pub fn perception(&self) -> Option<&dyn Perception> {
        self.world.perception()
    }

    pub fn actuation(&mut self) -> Option<&mut dyn Actuation> {
        self.world.actuation()
    }

    pub fn tactics(&mut self) -> Option<&mut dyn TacticalQueries> {
        self.world.tactics()
    }

    /// Position of the evaluated unit, if perception is bound and knows it.
    pub fn own_position(&self) -> Option<rts_ai_core::Vec3> {
        self.perception()?.unit_position(self.agent.unit)
    }

    pub fn set_decision(&mut self, decision: impl Into<BbValue>) {
        self.vars.set(keys::ACTION, decision);
    }

    pub fn decision(&self) -> Option<&BbValue> {
        self.vars.get(keys::ACTION)
    }
}
