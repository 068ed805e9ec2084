//! Agent-level runtime for `rts-ai-bt` trees: templates and their registry, per-agent wrappers
//! that sync a blackboard with the tree context, and a budgeted batch scheduler.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod registry;
pub mod scheduler;
pub mod template;
pub mod wrapper;

pub use config::{RuntimeConfig, SchedulerConfig, WrapperConfig};
pub use error::{ConfigError, RegistryError, SchedulerError, WrapperError};
pub use registry::{Diagnostic, Registry, Spawned, IDLE_TREE_TYPE};
pub use scheduler::{
    BatchScheduler, Clock, ManualClock, MonotonicClock, PriorityTier, QueueEntry,
    SchedulerSnapshot, SchedulerState, TickReport,
};
pub use template::{TemplateSpec, TreeFactory, TreeTemplate, DEFAULT_TEMPLATE_ID};
pub use wrapper::{AgentWrapper, Evaluation, WrapperSnapshot, WRAPPER_STREAM};
