use crate::{FactionId, UnitId, Vec3};

/// Read-only spatial queries.
pub trait Perception {
    fn unit_position(&self, unit: UnitId) -> Option<Vec3>;

    /// Units hostile to `faction` within `radius` of `pos`.
    fn enemies_in_range(&self, pos: Vec3, radius: f32, faction: FactionId) -> Vec<UnitId>;

    /// Units friendly to `faction` within `radius` of `pos`.
    fn allies_in_range(&self, pos: Vec3, radius: f32, faction: FactionId) -> Vec<UnitId>;
}

/// Effect sink for decisions. Calls return `false` when the request was rejected.
pub trait Actuation {
    fn request_movement(&mut self, unit: UnitId, target: Vec3) -> bool;
    fn set_attack_target(&mut self, unit: UnitId, target: UnitId) -> bool;
}

/// Faction-specific world lookups consumed by leaves.
pub trait TacticalQueries {
    fn high_ground_near(&self, pos: Vec3, radius: f32) -> Option<Vec3>;
    fn cover_position(&self, pos: Vec3, threat: Vec3) -> Option<Vec3>;
    fn patrol_point(&self, unit: UnitId, index: u32) -> Option<Vec3>;
    fn apply_buff(&mut self, unit: UnitId, buff: &str) -> bool;
}

/// Everything a tree may call out to during evaluation.
///
/// Each capability is optional: an unbound capability returns `None`, and leaves that need it
/// fail instead of halting the simulation. Implementors usually implement the capability traits
/// on the same type and return `Some(self)`.
pub trait World {
    fn perception(&self) -> Option<&dyn Perception> {
        None
    }

    fn actuation(&mut self) -> Option<&mut dyn Actuation> {
        None
    }

    fn tactics(&mut self) -> Option<&mut dyn TacticalQueries> {
        None
    }
}

/// A world with no collaborators bound. Agents evaluated against it can only idle.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullWorld;

impl World for NullWorld {}
