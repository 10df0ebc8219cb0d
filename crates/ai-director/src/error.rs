use std::path::PathBuf;

use ai_core::{AgentId, AgentKind, EntityId};
use thiserror::Error;

use crate::lifecycle::DirectorState;

#[derive(Debug, Error)]
pub enum DirectorError {
    #[error("a live {kind} agent ({existing}) already exists for {entity}")]
    DuplicateAgent {
        entity: EntityId,
        kind: AgentKind,
        existing: AgentId,
    },

    #[error("invalid entity reference: {0}")]
    InvalidEntity(EntityId),

    #[error("unknown agent: {0}")]
    UnknownAgent(AgentId),

    #[error("cannot {operation} while director is {from:?}")]
    InvalidTransition {
        from: DirectorState,
        operation: &'static str,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config from {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config from {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to serialize config")]
    Serialize(#[source] serde_yaml::Error),

    #[error("invalid config value for `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: &'static str) -> Self {
        Self::Invalid { field, reason }
    }
}
