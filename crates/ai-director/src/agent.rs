use std::collections::BTreeMap;

use ai_core::{AgentId, AgentKind, AgentLogic, DecisionError, EntityId, Priority, WorldView};
use serde::Serialize;

use crate::mailbox::Mailbox;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Uninitialized,
    Active,
    /// Skipped by the scheduler; the mailbox keeps accepting messages.
    Paused,
    /// Terminal. A destroyed agent is removed from every index.
    Destroyed,
}

/// A schedulable unit of AI logic together with its mailbox and scheduling bookkeeping.
pub struct Agent<W>
where
    W: WorldView + 'static,
{
    id: AgentId,
    kind: AgentKind,
    owner: Option<EntityId>,
    state: AgentState,
    pub(crate) mailbox: Mailbox,
    pub(crate) logic: Box<dyn AgentLogic<W>>,
    created_frame: u64,
    last_serviced_frame: Option<u64>,
    frames_since_service: u64,
    message_budget: usize,
    services: u64,
    fault: Option<DecisionError>,
}

impl<W> Agent<W>
where
    W: WorldView + 'static,
{
    pub(crate) fn new(
        id: AgentId,
        owner: Option<EntityId>,
        logic: Box<dyn AgentLogic<W>>,
        mailbox_capacity: usize,
        message_budget: usize,
        created_frame: u64,
    ) -> Self {
        Self {
            id,
            kind: logic.kind(),
            owner,
            state: AgentState::Uninitialized,
            mailbox: Mailbox::new(mailbox_capacity),
            logic,
            created_frame,
            last_serviced_frame: None,
            frames_since_service: 0,
            message_budget: message_budget.max(1),
            services: 0,
            fault: None,
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    pub fn owner(&self) -> Option<EntityId> {
        self.owner
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == AgentState::Active
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    pub fn created_frame(&self) -> u64 {
        self.created_frame
    }

    pub fn last_serviced_frame(&self) -> Option<u64> {
        self.last_serviced_frame
    }

    pub fn frames_since_service(&self) -> u64 {
        self.frames_since_service
    }

    /// Maximum messages drained per service.
    pub fn message_budget(&self) -> usize {
        self.message_budget
    }

    pub fn set_message_budget(&mut self, budget: usize) {
        self.message_budget = budget.max(1);
    }

    pub fn services(&self) -> u64 {
        self.services
    }

    /// The decision error that paused this agent, if any.
    pub fn fault(&self) -> Option<&DecisionError> {
        self.fault.as_ref()
    }

    pub fn logic(&self) -> &dyn AgentLogic<W> {
        self.logic.as_ref()
    }

    pub(crate) fn activate(&mut self) {
        self.state = AgentState::Active;
        self.fault = None;
    }

    pub(crate) fn pause(&mut self) {
        if self.state == AgentState::Active {
            self.state = AgentState::Paused;
        }
    }

    pub(crate) fn fail(&mut self, error: DecisionError) {
        self.pause();
        self.fault = Some(error);
    }

    pub(crate) fn mark_destroyed(&mut self) -> usize {
        self.state = AgentState::Destroyed;
        self.mailbox.clear()
    }

    pub(crate) fn mark_serviced(&mut self, frame: u64) {
        self.last_serviced_frame = Some(frame);
        self.frames_since_service = 0;
        self.services += 1;
    }

    pub(crate) fn mark_skipped(&mut self) {
        self.frames_since_service = self.frames_since_service.saturating_add(1);
    }

    pub fn summary(&self) -> AgentSummary {
        AgentSummary {
            id: self.id,
            kind: self.kind,
            owner: self.owner,
            state: self.state,
            backlog: self.mailbox.len(),
            backlog_by_priority: self.mailbox.counts(),
            frames_since_service: self.frames_since_service,
            services: self.services,
            fault: self.fault.as_ref().map(|e| e.to_string()),
        }
    }
}

/// Read-only diagnostic view of one agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentSummary {
    pub id: AgentId,
    pub kind: AgentKind,
    pub owner: Option<EntityId>,
    pub state: AgentState,
    pub backlog: usize,
    pub backlog_by_priority: BTreeMap<Priority, usize>,
    pub frames_since_service: u64,
    pub services: u64,
    pub fault: Option<String>,
}
