use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Message, Outbound, TickContext, WorldView};

/// Stable identifier for an agent. Ids are never reused within one director.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct AgentId(pub u32);

impl AgentId {
    pub fn stable_id(self) -> u64 {
        self.0 as u64
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent#{}", self.0)
    }
}

/// Reference to a simulation entity (realm, character, ...) owned by the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AgentKind {
    Nation,
    Character,
    Council,
}

impl AgentKind {
    pub const ALL: [AgentKind; 3] = [AgentKind::Nation, AgentKind::Character, AgentKind::Council];

    pub fn as_str(self) -> &'static str {
        match self {
            AgentKind::Nation => "nation",
            AgentKind::Character => "character",
            AgentKind::Council => "council",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single decision step.
///
/// The director never lets this escape a frame: the agent that produced it is paused and the
/// fault is counted in metrics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecisionError {
    #[error("entity {0} no longer exists")]
    DanglingEntity(EntityId),

    #[error("decision step failed: {0}")]
    Failed(String),
}

impl DecisionError {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }
}

/// Capability contract every agent variant implements.
///
/// `update` is the only point where agent-type-specific logic runs. It must run to completion
/// without blocking; long work is split across frames by the agent itself.
pub trait AgentLogic<W>: 'static
where
    W: WorldView + 'static,
{
    fn kind(&self) -> AgentKind;

    fn update(
        &mut self,
        ctx: &TickContext,
        inbox: Vec<Message>,
        world: &mut W,
    ) -> Result<Vec<Outbound>, DecisionError>;

    /// Diagnostic snapshot of internal state. Not a persistence format.
    fn serialize(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}
