use rts_ai_bt::SnapshotError;
use rts_ai_core::UnitId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("no `default` template is registered")]
    MissingDefault,
    #[error("the `default` template cannot be unregistered")]
    DefaultTemplateRequired,
    #[error("the `default` template names tree type `{tree_type}`, which has no factory")]
    UnbuildableDefault { tree_type: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse runtime config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("scheduler.budget_ms must be a positive number, got {0}")]
    InvalidBudget(f64),
    #[error("scheduler.max_agents_per_tick must be at least 1")]
    ZeroCeiling,
    #[error("wrapper.decision_key must not be empty")]
    EmptyDecisionKey,
    #[error("template id `{0}` is declared more than once")]
    DuplicateTemplate(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WrapperError {
    #[error("snapshot is for unit {found}, wrapper drives unit {expected}")]
    UnitMismatch { expected: UnitId, found: UnitId },
    #[error(transparent)]
    Tree(#[from] SnapshotError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("agent {0} is not registered")]
    UnknownAgent(UnitId),
    #[error("agent {0} appears more than once in the snapshot")]
    DuplicateAgent(UnitId),
    #[error("snapshot covers {found} agents, scheduler has {expected}")]
    MembershipMismatch { expected: usize, found: usize },
    #[error("agent {unit}: {source}")]
    Agent {
        unit: UnitId,
        #[source]
        source: WrapperError,
    },
}
