//! A small deterministic battlefield for headless runs.

use std::collections::BTreeMap;

use rts_ai_core::{
    derive_seed, Actuation, DeterministicRng, FactionId, Perception, SplitMix64, TacticalQueries,
    UnitId, Vec3, World,
};

const WORLD_STREAM: u64 = 0x574F_524C_4400_0001;

/// Unit types handed out round-robin at spawn.
pub const UNIT_TYPES: [&str; 3] = ["infantry", "medic", "tank"];

const PATROL_OFFSETS: [Vec3; 4] = [
    Vec3::new(6.0, 0.0, 0.0),
    Vec3::new(6.0, 0.0, 6.0),
    Vec3::new(0.0, 0.0, 6.0),
    Vec3::new(0.0, 0.0, 0.0),
];

const HIGH_GROUND: [Vec3; 4] = [
    Vec3::new(30.0, 4.0, 10.0),
    Vec3::new(30.0, 4.0, 30.0),
    Vec3::new(12.0, 3.0, 20.0),
    Vec3::new(48.0, 3.0, 20.0),
];

#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub faction: FactionId,
    pub unit_type: &'static str,
    pub home: Vec3,
    pub position: Vec3,
    pub destination: Option<Vec3>,
    pub target: Option<UnitId>,
    pub buffs: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SkirmishWorld {
    units: BTreeMap<UnitId, Unit>,
    /// Distance covered per second of simulated time.
    speed: f32,
}

impl SkirmishWorld {
    /// Two factions facing each other across a 60x40 field; odd units fight for faction 1.
    pub fn generate(count: u64, seed: u64) -> Self {
        let mut rng = SplitMix64::new(derive_seed(seed, 0, WORLD_STREAM));
        let mut units = BTreeMap::new();
        for unit in 1..=count {
            let faction = faction_of(unit);
            let base_x = if faction == 1 { 0.0 } else { 40.0 };
            let home = Vec3::new(
                base_x + rng.next_f32_unit() * 20.0,
                0.0,
                rng.next_f32_unit() * 40.0,
            );
            units.insert(
                unit,
                Unit {
                    faction,
                    unit_type: unit_type_of(unit),
                    home,
                    position: home,
                    destination: None,
                    target: None,
                    buffs: Vec::new(),
                },
            );
        }
        Self { units, speed: 4.0 }
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub fn units(&self) -> impl Iterator<Item = (UnitId, &Unit)> {
        self.units.iter().map(|(id, u)| (*id, u))
    }

    /// Advance movement by `dt_seconds`.
    pub fn step(&mut self, dt_seconds: f32) {
        let max_step = self.speed * dt_seconds;
        for unit in self.units.values_mut() {
            if let Some(dest) = unit.destination {
                unit.position = unit.position.move_towards(dest, max_step);
                if unit.position.distance(dest) <= f32::EPSILON {
                    unit.destination = None;
                }
            }
        }
    }

    fn in_range(
        &self,
        pos: Vec3,
        radius: f32,
        keep: impl Fn(FactionId) -> bool,
    ) -> Vec<UnitId> {
        self.units
            .iter()
            .filter(|(_, u)| keep(u.faction) && u.position.distance(pos) <= radius)
            .map(|(id, _)| *id)
            .collect()
    }
}

pub fn faction_of(unit: UnitId) -> FactionId {
    if unit % 2 == 1 {
        1
    } else {
        2
    }
}

pub fn unit_type_of(unit: UnitId) -> &'static str {
    UNIT_TYPES[(unit % UNIT_TYPES.len() as u64) as usize]
}

impl Perception for SkirmishWorld {
    fn unit_position(&self, unit: UnitId) -> Option<Vec3> {
        self.units.get(&unit).map(|u| u.position)
    }

    fn enemies_in_range(&self, pos: Vec3, radius: f32, faction: FactionId) -> Vec<UnitId> {
        self.in_range(pos, radius, |f| f != faction)
    }

    fn allies_in_range(&self, pos: Vec3, radius: f32, faction: FactionId) -> Vec<UnitId> {
        self.in_range(pos, radius, |f| f == faction)
    }
}

impl Actuation for SkirmishWorld {
    fn request_movement(&mut self, unit: UnitId, target: Vec3) -> bool {
        match self.units.get_mut(&unit) {
            Some(u) => {
                u.destination = Some(target);
                true
            }
            None => false,
        }
    }

    fn set_attack_target(&mut self, unit: UnitId, target: UnitId) -> bool {
        if !self.units.contains_key(&target) {
            return false;
        }
        match self.units.get_mut(&unit) {
            Some(u) => {
                u.target = Some(target);
                true
            }
            None => false,
        }
    }
}

impl TacticalQueries for SkirmishWorld {
    fn high_ground_near(&self, pos: Vec3, radius: f32) -> Option<Vec3> {
        HIGH_GROUND
            .iter()
            .copied()
            .filter(|spot| spot.distance(pos) <= radius)
            .min_by(|a, b| a.distance(pos).total_cmp(&b.distance(pos)))
    }

    fn cover_position(&self, pos: Vec3, threat: Vec3) -> Option<Vec3> {
        let away = pos - threat;
        let len = away.length();
        if len <= f32::EPSILON {
            return None;
        }
        Some(pos + away * (3.0 / len))
    }

    fn patrol_point(&self, unit: UnitId, index: u32) -> Option<Vec3> {
        let home = self.units.get(&unit)?.home;
        PATROL_OFFSETS
            .get(index as usize)
            .map(|offset| home + *offset)
    }

    fn apply_buff(&mut self, unit: UnitId, buff: &str) -> bool {
        match self.units.get_mut(&unit) {
            Some(u) => {
                if !u.buffs.iter().any(|b| b == buff) {
                    u.buffs.push(buff.to_string());
                }
                true
            }
            None => false,
        }
    }
}

impl World for SkirmishWorld {
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
