#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Per-step simulation clock handed down to every evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TickContext {
    pub tick: u64,
    pub dt_seconds: f32,
}

impl TickContext {
    pub fn new(tick: u64, dt_seconds: f32) -> Self {
        Self { tick, dt_seconds }
    }

    pub fn next(self) -> Self {
        Self {
            tick: self.tick.wrapping_add(1),
            ..self
        }
    }
}

impl Default for TickContext {
    fn default() -> Self {
        Self {
            tick: 0,
            dt_seconds: 0.1,
        }
    }
}
