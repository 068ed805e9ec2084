use std::collections::BTreeMap;

use rts_ai_bt::leaves::{AcquireTarget, Chance, MoveTo, Patrol, SetDecision, Wait};
use rts_ai_bt::{ActionNode, BtNode, Selector, Sequence};
use rts_ai_core::{
    Actuation, BbValue, FactionId, Perception, TacticalQueries, TickContext, UnitId, Vec3, World,
};
use rts_ai_runtime::{
    BatchScheduler, ManualClock, PriorityTier, Registry, SchedulerConfig, TreeTemplate,
};

/// Scripted world: movement requests teleport the unit; every request is recorded.
#[derive(Debug, Default)]
struct Scripted {
    units: BTreeMap<UnitId, (FactionId, Vec3)>,
    requests: Vec<String>,
}

impl Scripted {
    fn new() -> Self {
        let mut units = BTreeMap::new();
        for id in 1..=6u64 {
            let faction = if id % 2 == 0 { 2 } else { 1 };
            units.insert(id, (faction, Vec3::new(id as f32 * 3.0, 0.0, 0.0)));
        }
        Self {
            units,
            requests: Vec::new(),
        }
    }
}

impl Perception for Scripted {
    fn unit_position(&self, unit: UnitId) -> Option<Vec3> {
        self.units.get(&unit).map(|(_, p)| *p)
    }

    fn enemies_in_range(&self, pos: Vec3, radius: f32, faction: FactionId) -> Vec<UnitId> {
        self.units
            .iter()
            .filter(|(_, (f, p))| *f != faction && p.distance(pos) <= radius)
            .map(|(id, _)| *id)
            .collect()
    }

    fn allies_in_range(&self, _pos: Vec3, _radius: f32, _faction: FactionId) -> Vec<UnitId> {
        Vec::new()
    }
}

impl Actuation for Scripted {
    fn request_movement(&mut self, unit: UnitId, target: Vec3) -> bool {
        self.requests.push(format!("move {unit} {target}"));
        if let Some((_, pos)) = self.units.get_mut(&unit) {
            *pos = target;
        }
        true
    }

    fn set_attack_target(&mut self, unit: UnitId, target: UnitId) -> bool {
        self.requests.push(format!("attack {unit} {target}"));
        true
    }
}

impl TacticalQueries for Scripted {
    fn high_ground_near(&self, _pos: Vec3, _radius: f32) -> Option<Vec3> {
        None
    }

    fn cover_position(&self, _pos: Vec3, _threat: Vec3) -> Option<Vec3> {
        None
    }

    fn patrol_point(&self, unit: UnitId, index: u32) -> Option<Vec3> {
        (index < 3).then(|| Vec3::new(index as f32 * 10.0, unit as f32, 0.0))
    }

    fn apply_buff(&mut self, _unit: UnitId, _buff: &str) -> bool {
        true
    }
}

impl World for Scripted {
    fn perception(&self) -> Option<&dyn Perception> {
        Some(self)
    }

    fn actuation(&mut self) -> Option<&mut dyn Actuation> {
        Some(self)
    }

    fn tactics(&mut self) -> Option<&mut dyn TacticalQueries> {
        Some(self)
    }
}

fn skirmisher(_unit: UnitId) -> Box<dyn BtNode> {
    let engage = Sequence::new(
        "engage",
        vec![
            Box::new(ActionNode::new("coin", Chance { probability: 0.5 })) as Box<dyn BtNode>,
            Box::new(ActionNode::new("acquire", AcquireTarget { radius: 7.0 })),
            Box::new(ActionNode::new(
                "decide",
                SetDecision {
                    decision: BbValue::from("engage"),
                },
            )),
        ],
    );
    let roam = Sequence::new(
        "roam",
        vec![
            Box::new(ActionNode::new("patrol", Patrol)) as Box<dyn BtNode>,
            Box::new(ActionNode::new("pause", Wait::jittered(0, 2))),
            Box::new(ActionNode::new("move", MoveTo::default())),
        ],
    );
    Box::new(Selector::new("root", vec![Box::new(engage), Box::new(roam)]))
}

type Trajectory = Vec<(UnitId, String, Option<BbValue>, BTreeMap<String, BbValue>)>;

fn run(seed: u64) -> (Trajectory, Vec<String>) {
    let mut registry = Registry::new();
    registry.set_global_seed(seed);
    registry.register_tree_type("skirmisher", skirmisher);
    registry.register(TreeTemplate::new("skirmish", "skirmisher"));

    let mut scheduler =
        BatchScheduler::with_clock(SchedulerConfig::unbounded(4), ManualClock::default());
    for unit in 1..=6 {
        let faction = if unit % 2 == 0 { 2 } else { 1 };
        let spawned = registry.create_wrapper(unit, faction, "", None).unwrap();
        scheduler.register(spawned.wrapper, PriorityTier::Normal);
    }

    let mut world = Scripted::new();
    let mut trajectory = Vec::new();
    let mut tick = TickContext::default();
    for _ in 0..40 {
        let report = scheduler.tick(tick, &mut world);
        for eval in report.evaluated {
            let bb = scheduler.agent(eval.unit).unwrap().blackboard().flatten();
            trajectory.push((eval.unit, format!("{:?}", eval.status), eval.decision, bb));
        }
        tick = tick.next();
    }
    (trajectory, world.requests)
}

#[test]
fn same_seed_same_statuses_decisions_and_blackboards() {
    let (a, requests_a) = run(42);
    let (b, requests_b) = run(42);
    // 6 agents at 4 per tick: one pass every 2 ticks.
    assert_eq!(a.len(), 120);
    assert_eq!(a, b);
    assert_eq!(requests_a, requests_b);
}

#[test]
fn different_seeds_diverge() {
    let (a, _) = run(1);
    let (b, _) = run(2);
    assert_ne!(a, b);
}
