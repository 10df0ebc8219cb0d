//! Director configuration loading and validation.

use std::path::Path;

use ai_core::AgentKind;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Main director configuration, usually loaded from a YAML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorConfig {
    /// Wall-clock budget for one `process_frame` call, in milliseconds.
    #[serde(default = "default_frame_budget_ms")]
    pub per_frame_time_budget_ms: f64,

    /// Maximum agents serviced in one frame.
    #[serde(default = "default_max_agents_per_frame")]
    pub max_agents_per_frame: usize,

    /// Maximum mailbox entries drained per agent service.
    #[serde(default = "default_max_messages_per_agent")]
    pub max_messages_per_agent_per_frame: usize,

    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity_per_agent: usize,

    /// Frames an agent with pending work may go unserviced before it is promoted.
    #[serde(default = "default_max_starvation_frames")]
    pub max_starvation_frames: u64,

    #[serde(default)]
    pub attention: AttentionConfig,

    #[serde(default)]
    pub load_balance: LoadBalanceConfig,
}

fn default_frame_budget_ms() -> f64 {
    4.0
}
fn default_max_agents_per_frame() -> usize {
    10
}
fn default_max_messages_per_agent() -> usize {
    5
}
fn default_mailbox_capacity() -> usize {
    100
}
fn default_max_starvation_frames() -> u64 {
    60
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            per_frame_time_budget_ms: default_frame_budget_ms(),
            max_agents_per_frame: default_max_agents_per_frame(),
            max_messages_per_agent_per_frame: default_max_messages_per_agent(),
            mailbox_capacity_per_agent: default_mailbox_capacity(),
            max_starvation_frames: default_max_starvation_frames(),
            attention: AttentionConfig::default(),
            load_balance: LoadBalanceConfig::default(),
        }
    }
}

/// Weights for the per-frame attention score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttentionConfig {
    /// Added per pending message.
    pub backlog_weight: f64,
    /// Added per pending `High` message, on top of `backlog_weight`.
    pub high_weight: f64,
    /// Added per frame since the agent was last serviced.
    pub staleness_weight: f64,
    pub nation_weight: f64,
    pub character_weight: f64,
    pub council_weight: f64,
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            backlog_weight: 1.0,
            high_weight: 10.0,
            staleness_weight: 2.0,
            nation_weight: 5.0,
            character_weight: 3.0,
            council_weight: 4.0,
        }
    }
}

impl AttentionConfig {
    pub fn type_weight(&self, kind: AgentKind) -> f64 {
        match kind {
            AgentKind::Nation => self.nation_weight,
            AgentKind::Character => self.character_weight,
            AgentKind::Council => self.council_weight,
        }
    }
}

/// Periodic adjustment of `max_agents_per_frame` from observed backlog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadBalanceConfig {
    pub enabled: bool,
    pub interval_frames: u64,
    /// Backlog above which an agent counts as overloaded.
    pub overload_queue_depth: usize,
    /// More overloaded agents than this raises the per-frame agent budget.
    pub overloaded_agents_threshold: usize,
    /// Total backlog below which (with no overloaded agent) the budget is lowered.
    pub low_load_total: usize,
    pub increase_step: usize,
    pub decrease_step: usize,
    pub min_agents_per_frame: usize,
    pub max_agents_per_frame_cap: usize,
}

impl Default for LoadBalanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_frames: 300,
            overload_queue_depth: 50,
            overloaded_agents_threshold: 5,
            low_load_total: 100,
            increase_step: 2,
            decrease_step: 1,
            min_agents_per_frame: 5,
            max_agents_per_frame_cap: 20,
        }
    }
}

impl DirectorConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(ConfigError::Serialize)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.per_frame_time_budget_ms.is_finite() && self.per_frame_time_budget_ms > 0.0) {
            return Err(ConfigError::invalid(
                "per_frame_time_budget_ms",
                "must be a positive number of milliseconds",
            ));
        }
        if self.max_agents_per_frame == 0 {
            return Err(ConfigError::invalid("max_agents_per_frame", "must be at least 1"));
        }
        if self.max_messages_per_agent_per_frame == 0 {
            return Err(ConfigError::invalid(
                "max_messages_per_agent_per_frame",
                "must be at least 1",
            ));
        }
        if self.mailbox_capacity_per_agent == 0 {
            return Err(ConfigError::invalid("mailbox_capacity_per_agent", "must be at least 1"));
        }
        if self.max_starvation_frames == 0 {
            return Err(ConfigError::invalid("max_starvation_frames", "must be at least 1"));
        }

        let lb = &self.load_balance;
        if lb.enabled {
            if lb.interval_frames == 0 {
                return Err(ConfigError::invalid("load_balance.interval_frames", "must be at least 1"));
            }
            if lb.min_agents_per_frame == 0 || lb.min_agents_per_frame > lb.max_agents_per_frame_cap {
                return Err(ConfigError::invalid(
                    "load_balance.min_agents_per_frame",
                    "must be at least 1 and not above max_agents_per_frame_cap",
                ));
            }
            if self.max_agents_per_frame < lb.min_agents_per_frame
                || self.max_agents_per_frame > lb.max_agents_per_frame_cap
            {
                return Err(ConfigError::invalid(
                    "max_agents_per_frame",
                    "must lie within load_balance.min_agents_per_frame..=max_agents_per_frame_cap",
                ));
            }
        }
        Ok(())
    }
}
