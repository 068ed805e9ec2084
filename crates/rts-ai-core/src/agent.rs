#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Stable identifier for a simulated unit.
///
/// Deterministic simulation relies on the numeric value for ordering, seeding and logs, so ids
/// must not be recycled while a replay is being produced.
pub type UnitId = u64;

/// Faction identifier. `0` is reserved as the wildcard "any faction".
pub type FactionId = u32;

pub const ANY_FACTION: FactionId = 0;

/// The (unit, faction) pair a tree is evaluated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AgentRef {
    pub unit: UnitId,
    pub faction: FactionId,
}

impl AgentRef {
    pub fn new(unit: UnitId, faction: FactionId) -> Self {
        Self { unit, faction }
    }
}
