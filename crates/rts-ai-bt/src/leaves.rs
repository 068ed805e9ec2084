//! Generic leaves over the [`rts_ai_core::World`] collaborators.
//!
//! Every leaf here fails, rather than panicking, when a collaborator it needs is unbound or
//! cannot answer; an agent that cannot perceive anything simply idles.

use std::borrow::Cow;

use rts_ai_core::{BbValue, DeterministicRng, UnitId, Vec3};

use crate::bt::{BtNode, Status};
use crate::context::{keys, NodeContext};
use crate::nodes::{Action, ActionNode, Condition};

fn missing(ctx: &NodeContext<'_>, what: &'static str) -> Status {
    tracing::trace!(unit = ctx.unit(), collaborator = what, "collaborator unavailable");
    Status::Failure
}

/// Succeeds when at least one enemy is within `radius` of the unit.
pub fn enemy_in_range(radius: f32) -> Condition<impl FnMut(&NodeContext<'_>) -> bool + 'static> {
    Condition::new("enemy_in_range", move |ctx: &NodeContext<'_>| {
        let Some(perception) = ctx.perception() else {
            return false;
        };
        let Some(pos) = perception.unit_position(ctx.unit()) else {
            return false;
        };
        !perception
            .enemies_in_range(pos, radius, ctx.faction())
            .is_empty()
    })
}

/// Picks the closest enemy (ties broken by id) and writes `target_id` / `target_pos`.
#[derive(Debug, Clone)]
pub struct AcquireTarget {
    pub radius: f32,
}

impl Action for AcquireTarget {
    fn tick(&mut self, ctx: &mut NodeContext<'_>) -> Status {
        let Some(perception) = ctx.perception() else {
            return missing(ctx, "perception");
        };
        let Some(pos) = perception.unit_position(ctx.unit()) else {
            return Status::Failure;
        };

        let mut best: Option<(f32, UnitId, Vec3)> = None;
        for enemy in perception.enemies_in_range(pos, self.radius, ctx.faction()) {
            let Some(enemy_pos) = perception.unit_position(enemy) else {
                continue;
            };
            let dist = pos.distance(enemy_pos);
            let closer = match best {
                None => true,
                Some((d, id, _)) => dist < d || (dist == d && enemy < id),
            };
            if closer {
                best = Some((dist, enemy, enemy_pos));
            }
        }

        match best {
            Some((_, id, enemy_pos)) => {
                ctx.vars.set(keys::TARGET_ID, id);
                ctx.vars.set(keys::TARGET_POS, enemy_pos);
                Status::Success
            }
            None => {
                ctx.vars.remove(keys::TARGET_ID);
                ctx.vars.remove(keys::TARGET_POS);
                Status::Failure
            }
        }
    }
}

/// Multi-tick move to the position stored under `key`.
///
/// Issues one movement request per destination and then reports `Running` until the unit is
/// within `arrival_distance`. A changed destination re-issues the request.
#[derive(Debug, Clone)]
pub struct MoveTo {
    pub key: Cow<'static, str>,
    pub arrival_distance: f32,
    issued: Option<Vec3>,
}

impl MoveTo {
    pub fn new(key: impl Into<Cow<'static, str>>, arrival_distance: f32) -> Self {
        Self {
            key: key.into(),
            arrival_distance,
            issued: None,
        }
    }
}

impl Default for MoveTo {
    fn default() -> Self {
        Self::new(keys::MOVE_POS, 0.5)
    }
}

impl Action for MoveTo {
    fn tick(&mut self, ctx: &mut NodeContext<'_>) -> Status {
        let Some(target) = ctx.vars.get_as::<Vec3>(&self.key) else {
            return Status::Failure;
        };
        let Some(pos) = ctx.own_position() else {
            return missing(ctx, "perception");
        };

        if pos.distance(target) <= self.arrival_distance {
            self.issued = None;
            return Status::Success;
        }

        if self.issued != Some(target) {
            let unit = ctx.unit();
            let Some(actuation) = ctx.actuation() else {
                return missing(ctx, "actuation");
            };
            if !actuation.request_movement(unit, target) {
                return Status::Failure;
            }
            self.issued = Some(target);
        }

        ctx.set_decision("move");
        Status::Running
    }

    fn interrupt(&mut self) {
        self.issued = None;
    }

    fn reset(&mut self) {
        self.issued = None;
    }
}

/// Orders an attack on `target_id`.
#[derive(Debug, Clone, Default)]
pub struct AttackTarget;

impl Action for AttackTarget {
    fn tick(&mut self, ctx: &mut NodeContext<'_>) -> Status {
        let Some(target) = ctx.vars.get_as::<u64>(keys::TARGET_ID) else {
            return Status::Failure;
        };
        let unit = ctx.unit();
        let Some(actuation) = ctx.actuation() else {
            return missing(ctx, "actuation");
        };
        if !actuation.set_attack_target(unit, target) {
            return Status::Failure;
        }
        ctx.set_decision("attack");
        Status::Success
    }
}

/// Writes the nearest high ground within `radius` to `move_pos`.
#[derive(Debug, Clone)]
pub struct SeekHighGround {
    pub radius: f32,
}

impl Action for SeekHighGround {
    fn tick(&mut self, ctx: &mut NodeContext<'_>) -> Status {
        let Some(pos) = ctx.own_position() else {
            return missing(ctx, "perception");
        };
        let Some(tactics) = ctx.tactics() else {
            return missing(ctx, "tactics");
        };
        match tactics.high_ground_near(pos, self.radius) {
            Some(spot) => {
                ctx.vars.set(keys::MOVE_POS, spot);
                Status::Success
            }
            None => Status::Failure,
        }
    }
}

/// Writes a cover position against the threat at `target_pos` to `move_pos`.
#[derive(Debug, Clone, Default)]
pub struct TakeCover;

impl Action for TakeCover {
    fn tick(&mut self, ctx: &mut NodeContext<'_>) -> Status {
        let Some(threat) = ctx.vars.get_as::<Vec3>(keys::TARGET_POS) else {
            return Status::Failure;
        };
        let Some(pos) = ctx.own_position() else {
            return missing(ctx, "perception");
        };
        let Some(tactics) = ctx.tactics() else {
            return missing(ctx, "tactics");
        };
        match tactics.cover_position(pos, threat) {
            Some(cover) => {
                ctx.vars.set(keys::MOVE_POS, cover);
                Status::Success
            }
            None => Status::Failure,
        }
    }
}

/// Writes the next patrol waypoint to `move_pos` and advances `patrol_index`, wrapping to the
/// first waypoint when the route runs out.
#[derive(Debug, Clone, Default)]
pub struct Patrol;

impl Action for Patrol {
    fn tick(&mut self, ctx: &mut NodeContext<'_>) -> Status {
        let index = ctx.vars.get_as::<u32>(keys::PATROL_INDEX).unwrap_or(0);
        let unit = ctx.unit();
        let Some(tactics) = ctx.tactics() else {
            return missing(ctx, "tactics");
        };

        let (point, used) = match tactics.patrol_point(unit, index) {
            Some(p) => (p, index),
            None if index != 0 => match tactics.patrol_point(unit, 0) {
                Some(p) => (p, 0),
                None => return Status::Failure,
            },
            None => return Status::Failure,
        };

        ctx.vars.set(keys::MOVE_POS, point);
        ctx.vars.set(keys::PATROL_INDEX, used.saturating_add(1));
        ctx.set_decision("patrol");
        Status::Success
    }
}

#[derive(Debug, Clone)]
pub struct ApplyBuff {
    pub buff: String,
}

impl Action for ApplyBuff {
    fn tick(&mut self, ctx: &mut NodeContext<'_>) -> Status {
        let unit = ctx.unit();
        let Some(tactics) = ctx.tactics() else {
            return missing(ctx, "tactics");
        };
        Status::from_bool(tactics.apply_buff(unit, &self.buff))
    }
}

/// Runs for a number of ticks, optionally drawn from the node's own RNG stream on start.
#[derive(Debug, Clone)]
pub struct Wait {
    min_ticks: u32,
    max_ticks: u32,
    remaining: Option<u32>,
}

impl Wait {
    pub fn ticks(ticks: u32) -> Self {
        Self::jittered(ticks, ticks)
    }

    pub fn jittered(min_ticks: u32, max_ticks: u32) -> Self {
        Self {
            min_ticks,
            max_ticks: max_ticks.max(min_ticks),
            remaining: None,
        }
    }
}

impl Action for Wait {
    fn tick(&mut self, ctx: &mut NodeContext<'_>) -> Status {
        let remaining = match self.remaining {
            Some(r) => r,
            None => ctx.node_rng.next_range_u32(self.min_ticks, self.max_ticks),
        };
        if remaining == 0 {
            self.remaining = None;
            return Status::Success;
        }
        self.remaining = Some(remaining - 1);
        ctx.set_decision("wait");
        Status::Running
    }

    fn interrupt(&mut self) {
        self.remaining = None;
    }

    fn reset(&mut self) {
        self.remaining = None;
    }

    fn progress(&self) -> Option<i64> {
        self.remaining.map(i64::from)
    }

    fn restore_progress(&mut self, progress: i64) {
        self.remaining = u32::try_from(progress).ok();
    }
}

/// Succeeds with probability `p`, drawn from the agent's gameplay stream.
#[derive(Debug, Clone)]
pub struct Chance {
    pub probability: f32,
}

impl Action for Chance {
    fn tick(&mut self, ctx: &mut NodeContext<'_>) -> Status {
        Status::from_bool(ctx.rng.next_f32_unit() < self.probability)
    }
}

/// Writes a fixed decision and succeeds.
#[derive(Debug, Clone)]
pub struct SetDecision {
    pub decision: BbValue,
}

impl Action for SetDecision {
    fn tick(&mut self, ctx: &mut NodeContext<'_>) -> Status {
        ctx.set_decision(self.decision.clone());
        Status::Success
    }
}

/// The fallback tree: decide to idle.
pub fn idle_tree() -> Box<dyn BtNode> {
    Box::new(ActionNode::new(
        "idle",
        SetDecision {
            decision: BbValue::from("idle"),
        },
    ))
}
