//! Budgeted, priority-ordered, cursor-resuming evaluation of many agents.
//!
//! The queue is sorted by [`PriorityTier`] (stable, so ties keep their previous relative order)
//! and rebuilt whenever membership or a tier changes. Each [`BatchScheduler::tick`] resumes at a
//! persistent cursor and evaluates agents until one of three things happens:
//!
//! - the per-tick ceiling is reached,
//! - the wall-clock budget is exceeded (checked after each agent; the agent's result stands),
//! - the cursor wraps past the end of the queue, completing a pass.
//!
//! Stopping at the pass boundary means that, while the queue is unchanged, no agent is evaluated
//! twice in one pass, so with `n` agents and a ceiling of `k` a full pass takes `ceil(n / k)`
//! unbudgeted ticks. A rebuild mid-pass resumes at the first agent not yet served in that pass.

use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

use rts_ai_core::{TickContext, UnitId, World};
use rts_ai_tools::{emit, TraceEvent, TraceSink};
use serde::{Deserialize, Serialize};

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::wrapper::{AgentWrapper, Evaluation, WrapperSnapshot};

/// Time source for budget checks.
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven clock; clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get().saturating_add(by));
    }

    pub fn set(&self, now: Duration) {
        self.now.set(now);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// Service class; every `Critical` agent precedes every `High` agent in a pass, and so on.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    Critical,
    High,
    #[default]
    Normal,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub unit_id: UnitId,
    pub tier: PriorityTier,
    /// Simulation tick of the agent's last evaluation.
    pub last_update: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// Under budget; the tick keeps advancing.
    #[default]
    Accepting,
    /// Budget exceeded; the cursor is frozen until the next tick.
    Suspended,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub evaluated: Vec<Evaluation>,
    pub budget_exceeded: bool,
    pub elapsed: Duration,
    /// Where the next tick resumes.
    pub cursor: usize,
    /// Whether this tick finished a pass over the queue.
    pub pass_completed: bool,
    /// Passes completed since the scheduler was created.
    pub passes: u64,
}

impl TickReport {
    pub fn units(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.evaluated.iter().map(|e| e.unit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerSnapshot {
    pub cursor: usize,
    pub passes: u64,
    pub state: SchedulerState,
    pub queue: Vec<QueueEntry>,
    pub agents: Vec<WrapperSnapshot>,
}

/// Owns the registered agents and paces their evaluation.
pub struct BatchScheduler<C: Clock = MonotonicClock> {
    config: SchedulerConfig,
    clock: C,
    agents: BTreeMap<UnitId, AgentWrapper>,
    queue: Vec<QueueEntry>,
    cursor: usize,
    passes: u64,
    state: SchedulerState,
    trace: Option<Box<dyn TraceSink>>,
}

impl BatchScheduler<MonotonicClock> {
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_clock(config, MonotonicClock::default())
    }
}

impl<C: Clock> BatchScheduler<C> {
    pub fn with_clock(config: SchedulerConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            agents: BTreeMap::new(),
            queue: Vec::new(),
            cursor: 0,
            passes: 0,
            state: SchedulerState::Accepting,
            trace: None,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SchedulerConfig) {
        self.config = config;
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn set_trace_sink(&mut self, sink: Option<Box<dyn TraceSink>>) {
        self.trace = sink;
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn queue(&self) -> &[QueueEntry] {
        &self.queue
    }

    pub fn agent(&self, unit: UnitId) -> Option<&AgentWrapper> {
        self.agents.get(&unit)
    }

    pub fn agent_mut(&mut self, unit: UnitId) -> Option<&mut AgentWrapper> {
        self.agents.get_mut(&unit)
    }

    pub fn agents(&self) -> impl Iterator<Item = &AgentWrapper> {
        self.agents.values()
    }

    /// Add an agent (replacing one with the same unit id) and rebuild the queue.
    pub fn register(&mut self, wrapper: AgentWrapper, tier: PriorityTier) -> Option<AgentWrapper> {
        let unit = wrapper.unit();
        let previous = self.agents.insert(unit, wrapper);
        let mut entries = self.queue.clone();
        match entries.iter_mut().find(|e| e.unit_id == unit) {
            Some(entry) => entry.tier = tier,
            None => entries.push(QueueEntry {
                unit_id: unit,
                tier,
                last_update: None,
            }),
        }
        self.rebuild(entries);
        tracing::debug!(unit, ?tier, agents = self.queue.len(), "agent registered");
        previous
    }

    pub fn unregister(&mut self, unit: UnitId) -> Option<AgentWrapper> {
        let removed = self.agents.remove(&unit)?;
        let entries = self
            .queue
            .iter()
            .filter(|e| e.unit_id != unit)
            .cloned()
            .collect();
        self.rebuild(entries);
        tracing::debug!(unit, agents = self.queue.len(), "agent unregistered");
        Some(removed)
    }

    pub fn set_tier(&mut self, unit: UnitId, tier: PriorityTier) -> Result<(), SchedulerError> {
        let mut entries = self.queue.clone();
        let entry = entries
            .iter_mut()
            .find(|e| e.unit_id == unit)
            .ok_or(SchedulerError::UnknownAgent(unit))?;
        if entry.tier != tier {
            entry.tier = tier;
            self.rebuild(entries);
        }
        Ok(())
    }

    /// Stable-sort `entries` by tier. The cursor moves to the first agent that had not yet been
    /// served in the current pass, so a tier change can repeat an agent within a pass but never
    /// skip one. Agents added mid-pass wait for the next pass.
    fn rebuild(&mut self, mut entries: Vec<QueueEntry>) {
        let pending: BTreeSet<UnitId> = self
            .queue
            .get(self.cursor..)
            .unwrap_or_default()
            .iter()
            .map(|e| e.unit_id)
            .collect();

        entries.sort_by_key(|e| e.tier);

        self.cursor = entries
            .iter()
            .position(|e| pending.contains(&e.unit_id))
            .unwrap_or(0);
        self.queue = entries;
    }

    /// Evaluate the next batch of agents. Never fails; budget overruns are reported.
    pub fn tick(&mut self, tick: TickContext, world: &mut dyn World) -> TickReport {
        let start = self.clock.now();
        let budget = self.config.budget();
        let ceiling = self.config.max_agents_per_tick.min(self.queue.len());

        self.state = SchedulerState::Accepting;
        let mut evaluated = Vec::with_capacity(ceiling);
        let mut visited = 0;
        let mut pass_completed = false;
        let mut elapsed = Duration::ZERO;

        while visited < ceiling {
            visited += 1;
            let entry = &mut self.queue[self.cursor];
            let unit = entry.unit_id;
            entry.last_update = Some(tick.tick);
            if let Some(agent) = self.agents.get_mut(&unit) {
                evaluated.push(agent.evaluate(tick, world));
            }

            self.cursor += 1;
            if self.cursor >= self.queue.len() {
                self.cursor = 0;
                self.passes = self.passes.saturating_add(1);
                pass_completed = true;
            }

            elapsed = self.clock.now().saturating_sub(start);
            if elapsed > budget {
                self.state = SchedulerState::Suspended;
                tracing::warn!(
                    tick = tick.tick,
                    unit,
                    evaluated = evaluated.len(),
                    elapsed_us = elapsed.as_micros() as u64,
                    budget_us = budget.as_micros() as u64,
                    "scheduler budget exceeded; suspending until next tick"
                );
                emit(
                    self.trace.as_deref_mut(),
                    TraceEvent::new(tick.tick, "sched.budget_exceeded")
                        .with_agent(unit)
                        .with_a(evaluated.len() as u64)
                        .with_b(self.cursor as u64),
                );
                break;
            }
            if pass_completed {
                break;
            }
        }

        emit(
            self.trace.as_deref_mut(),
            TraceEvent::new(tick.tick, "sched.tick")
                .with_a(evaluated.len() as u64)
                .with_b(self.cursor as u64),
        );
        tracing::debug!(
            tick = tick.tick,
            evaluated = evaluated.len(),
            cursor = self.cursor,
            passes = self.passes,
            elapsed_us = elapsed.as_micros() as u64,
            "scheduler tick"
        );

        TickReport {
            tick: tick.tick,
            budget_exceeded: self.state == SchedulerState::Suspended,
            evaluated,
            elapsed,
            cursor: self.cursor,
            pass_completed,
            passes: self.passes,
        }
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            cursor: self.cursor,
            passes: self.passes,
            state: self.state,
            queue: self.queue.clone(),
            agents: self.agents.values().map(AgentWrapper::snapshot).collect(),
        }
    }

    /// Restore into a scheduler holding the same agents (e.g. rebuilt from the same registry).
    ///
    /// Membership is validated before any agent is touched: the queue and the agent list must each
    /// name every registered agent exactly once.
    pub fn restore(&mut self, snapshot: SchedulerSnapshot) -> Result<(), SchedulerError> {
        if snapshot.agents.len() != self.agents.len() || snapshot.queue.len() != self.agents.len()
        {
            return Err(SchedulerError::MembershipMismatch {
                expected: self.agents.len(),
                found: snapshot.agents.len(),
            });
        }
        self.check_members(snapshot.queue.iter().map(|e| e.unit_id))?;
        self.check_members(snapshot.agents.iter().map(|a| a.agent.unit))?;

        for agent in snapshot.agents {
            let unit = agent.agent.unit;
            if let Some(wrapper) = self.agents.get_mut(&unit) {
                wrapper
                    .restore(agent)
                    .map_err(|source| SchedulerError::Agent { unit, source })?;
            }
        }
        self.cursor = if snapshot.queue.is_empty() {
            0
        } else {
            snapshot.cursor % snapshot.queue.len()
        };
        self.queue = snapshot.queue;
        self.passes = snapshot.passes;
        self.state = snapshot.state;
        Ok(())
    }

    /// `units` must name every registered agent exactly once. Callers check the count first.
    fn check_members(&self, units: impl Iterator<Item = UnitId>) -> Result<(), SchedulerError> {
        let mut seen = BTreeSet::new();
        for unit in units {
            if !self.agents.contains_key(&unit) {
                return Err(SchedulerError::UnknownAgent(unit));
            }
            if !seen.insert(unit) {
                return Err(SchedulerError::DuplicateAgent(unit));
            }
        }
        Ok(())
    }
}

impl<C: Clock> fmt::Debug for BatchScheduler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchScheduler")
            .field("config", &self.config)
            .field("agents", &self.queue.len())
            .field("cursor", &self.cursor)
            .field("passes", &self.passes)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
