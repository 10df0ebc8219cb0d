use crate::{AgentId, EntityId};

/// Per-service context handed to an agent's decision step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickContext {
    /// Frame counter of the director at the time of service.
    pub frame: u64,
    pub dt_seconds: f32,
    pub agent: AgentId,
    pub owner: Option<EntityId>,
}

impl TickContext {
    pub fn new(frame: u64, dt_seconds: f32, agent: AgentId, owner: Option<EntityId>) -> Self {
        Self {
            frame,
            dt_seconds,
            agent,
            owner,
        }
    }
}
