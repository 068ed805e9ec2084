use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use rts_ai_bt::{Status, Tree, TreeSnapshot};
use rts_ai_core::{
    derive_seed, AgentRef, BbValue, Blackboard, BlackboardSnapshot, SharedBlackboard, SplitMix64,
    TickContext, UnitId, World,
};
use serde::{Deserialize, Serialize};

use crate::config::WrapperConfig;
use crate::error::WrapperError;

/// Stream id separating an agent's gameplay RNG from its tree's node streams.
pub const WRAPPER_STREAM: u64 = 0x5752_4150_5045_5231;

/// Result of one [`AgentWrapper::evaluate`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub unit: UnitId,
    pub status: Status,
    pub decision: Option<BbValue>,
    /// Wall-clock cost; not part of the deterministic result.
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrapperSnapshot {
    pub agent: AgentRef,
    pub unit_type: String,
    pub template_id: String,
    pub rng_seed: u64,
    pub rng_state: u64,
    pub evaluations: u64,
    pub last_decision: Option<BbValue>,
    pub blackboard: BlackboardSnapshot,
    pub tree: TreeSnapshot,
}

/// Binds one tree, one blackboard and one gameplay RNG to one agent.
#[derive(Debug)]
pub struct AgentWrapper {
    agent: AgentRef,
    unit_type: String,
    template_id: String,
    tree: Tree,
    blackboard: Blackboard,
    rng_seed: u64,
    rng: SplitMix64,
    config: WrapperConfig,
    evaluations: u64,
    last_duration: Duration,
    last_decision: Option<BbValue>,
}

impl AgentWrapper {
    /// The gameplay RNG is derived from the tree's seed and the unit id.
    pub fn new(agent: AgentRef, unit_type: impl Into<String>, tree: Tree) -> Self {
        let rng_seed = derive_seed(tree.seed(), agent.unit, WRAPPER_STREAM);
        Self {
            agent,
            unit_type: unit_type.into(),
            template_id: String::new(),
            tree,
            blackboard: Blackboard::new(),
            rng_seed,
            rng: SplitMix64::new(rng_seed),
            config: WrapperConfig::default(),
            evaluations: 0,
            last_duration: Duration::ZERO,
            last_decision: None,
        }
    }

    pub fn with_template_id(mut self, template_id: impl Into<String>) -> Self {
        self.template_id = template_id.into();
        self
    }

    pub fn with_config(mut self, config: WrapperConfig) -> Self {
        self.config = config;
        self
    }

    /// Seed blackboard variables, e.g. a template's defaults.
    pub fn with_defaults(mut self, defaults: &BTreeMap<String, BbValue>) -> Self {
        for (key, value) in defaults {
            self.blackboard.set_var(key.clone(), value.clone());
        }
        self
    }

    pub fn unit(&self) -> UnitId {
        self.agent.unit
    }

    pub fn agent(&self) -> AgentRef {
        self.agent
    }

    pub fn unit_type(&self) -> &str {
        &self.unit_type
    }

    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    pub fn blackboard_mut(&mut self) -> &mut Blackboard {
        &mut self.blackboard
    }

    /// Read through to shared (e.g. faction-wide) state.
    pub fn set_parent_blackboard(&mut self, parent: Option<&SharedBlackboard>) {
        self.blackboard.set_parent(parent);
    }

    pub fn config(&self) -> &WrapperConfig {
        &self.config
    }

    pub fn rng_seed(&self) -> u64 {
        self.rng_seed
    }

    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    pub fn last_duration(&self) -> Duration {
        self.last_duration
    }

    pub fn last_decision(&self) -> Option<&BbValue> {
        self.last_decision.as_ref()
    }

    /// Run one decision step: blackboard into context, execute, whitelisted keys back out.
    pub fn evaluate(&mut self, tick: TickContext, world: &mut dyn World) -> Evaluation {
        let start = Instant::now();

        let decision_key = self.config.decision_key.as_str();
        let context = self.tree.context_mut();
        context.clear();
        context.extend(self.blackboard.flatten());
        context.remove(decision_key);

        let status = self.tree.execute(tick, self.agent, &mut self.rng, world);

        let context = self.tree.context();
        let decision = context.get(decision_key).cloned();
        for key in &self.config.write_back {
            match context.get(key) {
                Some(value) => {
                    if !self.blackboard.get_var(key).is_some_and(|old| old.same_as(value)) {
                        self.blackboard.set_var(key.clone(), value.clone());
                    }
                }
                None => {
                    self.blackboard.remove_var(key);
                }
            }
        }

        self.last_duration = start.elapsed();
        self.evaluations = self.evaluations.saturating_add(1);
        self.last_decision = decision.clone();
        tracing::trace!(
            unit = self.agent.unit,
            tick = tick.tick,
            ?status,
            decision = ?decision,
            "agent evaluated"
        );

        Evaluation {
            unit: self.agent.unit,
            status,
            decision,
            duration: self.last_duration,
        }
    }

    pub fn snapshot(&self) -> WrapperSnapshot {
        WrapperSnapshot {
            agent: self.agent,
            unit_type: self.unit_type.clone(),
            template_id: self.template_id.clone(),
            rng_seed: self.rng_seed,
            rng_state: self.rng.state(),
            evaluations: self.evaluations,
            last_decision: self.last_decision.clone(),
            blackboard: self.blackboard.snapshot(),
            tree: self.tree.snapshot(),
        }
    }

    /// Restore a [`WrapperSnapshot`] taken from a wrapper built from the same template.
    pub fn restore(&mut self, snapshot: WrapperSnapshot) -> Result<(), WrapperError> {
        if snapshot.agent.unit != self.agent.unit {
            return Err(WrapperError::UnitMismatch {
                expected: self.agent.unit,
                found: snapshot.agent.unit,
            });
        }
        self.tree.restore(snapshot.tree)?;
        self.blackboard.restore(snapshot.blackboard);
        self.agent = snapshot.agent;
        self.unit_type = snapshot.unit_type;
        self.template_id = snapshot.template_id;
        self.rng_seed = snapshot.rng_seed;
        self.rng = SplitMix64::from_state(snapshot.rng_state);
        self.evaluations = snapshot.evaluations;
        self.last_decision = snapshot.last_decision;
        Ok(())
    }
}
