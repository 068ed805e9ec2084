//! Runtime configuration, loaded from YAML.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use rts_ai_bt::keys;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::template::TemplateSpec;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub scheduler: SchedulerConfig,
    pub wrapper: WrapperConfig,
    /// Templates registered on top of the built-in `default`.
    pub templates: Vec<TemplateSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Wall-clock allowance per scheduler tick, in milliseconds.
    #[serde(default = "default_budget_ms")]
    pub budget_ms: f64,

    /// Hard ceiling on evaluations per tick.
    #[serde(default = "default_max_agents_per_tick")]
    pub max_agents_per_tick: usize,
}

fn default_budget_ms() -> f64 {
    2.0
}
fn default_max_agents_per_tick() -> usize {
    64
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            budget_ms: default_budget_ms(),
            max_agents_per_tick: default_max_agents_per_tick(),
        }
    }
}

impl SchedulerConfig {
    /// The budget as a [`Duration`]. Values too large to represent mean "unbounded".
    pub fn budget(&self) -> Duration {
        Duration::try_from_secs_f64(self.budget_ms / 1000.0).unwrap_or(Duration::MAX)
    }

    pub fn unbounded(max_agents_per_tick: usize) -> Self {
        Self {
            budget_ms: f64::INFINITY,
            max_agents_per_tick,
        }
    }
}

/// What an agent wrapper syncs between its blackboard and the tree context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrapperConfig {
    #[serde(default = "default_decision_key")]
    pub decision_key: String,

    /// Context keys copied back into the blackboard after each evaluation.
    #[serde(default = "default_write_back")]
    pub write_back: Vec<String>,
}

fn default_decision_key() -> String {
    keys::ACTION.to_string()
}
fn default_write_back() -> Vec<String> {
    [
        keys::TARGET_ID,
        keys::TARGET_POS,
        keys::MOVE_POS,
        keys::PATROL_INDEX,
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

impl Default for WrapperConfig {
    fn default() -> Self {
        Self {
            decision_key: default_decision_key(),
            write_back: default_write_back(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to load config from {}", path.display()))
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.scheduler.budget_ms > 0.0) {
            return Err(ConfigError::InvalidBudget(self.scheduler.budget_ms));
        }
        if self.scheduler.max_agents_per_tick == 0 {
            return Err(ConfigError::ZeroCeiling);
        }
        if self.wrapper.decision_key.is_empty() {
            return Err(ConfigError::EmptyDecisionKey);
        }
        let mut seen = BTreeSet::new();
        for spec in &self.templates {
            if !seen.insert(spec.id.as_str()) {
                return Err(ConfigError::DuplicateTemplate(spec.id.clone()));
            }
        }
        Ok(())
    }
}
