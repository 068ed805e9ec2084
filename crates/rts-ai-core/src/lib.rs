//! Deterministic, engine-agnostic primitives for RTS agent decision making.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod agent;
pub mod blackboard;
pub mod math;
pub mod rng;
pub mod tick;
pub mod value;
pub mod world;

pub use agent::{AgentRef, FactionId, UnitId, ANY_FACTION};
pub use blackboard::{
    Blackboard, BlackboardEvent, BlackboardSnapshot, ObserverId, SharedBlackboard, VarMeta,
};
pub use math::{ParseVec3Error, Vec3};
pub use rng::{derive_seed, split_seed, DeterministicRng, SplitMix64};
pub use tick::TickContext;
pub use value::{BbType, BbValue, ValueKind};
pub use world::{Actuation, NullWorld, Perception, TacticalQueries, World};
