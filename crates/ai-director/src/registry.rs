//! Agent creation, destruction, and lookup indices.

use std::collections::{BTreeMap, BTreeSet};

use ai_core::{AgentId, AgentKind, AgentLogic, EntityId, Topic, WorldView};

use crate::agent::Agent;
use crate::error::DirectorError;

/// Owns every live agent. Iteration is in ascending id order.
pub struct Registry<W>
where
    W: WorldView + 'static,
{
    agents: BTreeMap<AgentId, Agent<W>>,
    by_entity: BTreeMap<(EntityId, AgentKind), AgentId>,
    subscriptions: BTreeMap<Topic, BTreeSet<AgentId>>,
    next_id: u32,
}

impl<W> Default for Registry<W>
where
    W: WorldView + 'static,
{
    fn default() -> Self {
        Self {
            agents: BTreeMap::new(),
            by_entity: BTreeMap::new(),
            subscriptions: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<W> Registry<W>
where
    W: WorldView + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new agent and move it to `Active`.
    ///
    /// Fails without side effects if `owner` is not a live entity or already has a live agent
    /// of the same kind.
    pub fn create(
        &mut self,
        owner: Option<EntityId>,
        logic: Box<dyn AgentLogic<W>>,
        world: &W,
        mailbox_capacity: usize,
        message_budget: usize,
        frame: u64,
    ) -> Result<AgentId, DirectorError> {
        let kind = logic.kind();
        if let Some(entity) = owner {
            if !world.entity_exists(entity) {
                return Err(DirectorError::InvalidEntity(entity));
            }
            if let Some(&existing) = self.by_entity.get(&(entity, kind)) {
                return Err(DirectorError::DuplicateAgent {
                    entity,
                    kind,
                    existing,
                });
            }
        }

        let id = AgentId(self.next_id);
        self.next_id += 1;

        let mut agent = Agent::new(id, owner, logic, mailbox_capacity, message_budget, frame);
        agent.activate();

        if let Some(entity) = owner {
            self.by_entity.insert((entity, kind), id);
        }
        self.agents.insert(id, agent);
        Ok(id)
    }

    /// Remove an agent from every index. Returns the agent (now `Destroyed`, mailbox emptied)
    /// and how many pending messages were discarded, or `None` for unknown ids.
    pub fn destroy(&mut self, id: AgentId) -> Option<(Agent<W>, usize)> {
        let mut agent = self.agents.remove(&id)?;
        if let Some(entity) = agent.owner() {
            self.by_entity.remove(&(entity, agent.kind()));
        }
        self.subscriptions.retain(|_, subscribers| {
            subscribers.remove(&id);
            !subscribers.is_empty()
        });
        let discarded = agent.mark_destroyed();
        Some((agent, discarded))
    }

    pub fn lookup_by_entity(&self, entity: EntityId, kind: AgentKind) -> Option<AgentId> {
        self.by_entity.get(&(entity, kind)).copied()
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent<W>> {
        self.agents.get(&id)
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent<W>> {
        self.agents.get_mut(&id)
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.agents.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Agent<W>> {
        self.agents.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Agent<W>> {
        self.agents.values_mut()
    }

    pub fn ids(&self) -> Vec<AgentId> {
        self.agents.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.agents.values().filter(|a| a.is_active()).count()
    }

    pub fn queued_messages(&self) -> usize {
        self.agents.values().map(|a| a.mailbox().len()).sum()
    }

    pub fn subscribe(&mut self, id: AgentId, topic: Topic) -> Result<(), DirectorError> {
        if !self.agents.contains_key(&id) {
            return Err(DirectorError::UnknownAgent(id));
        }
        self.subscriptions.entry(topic).or_default().insert(id);
        Ok(())
    }

    pub fn unsubscribe(&mut self, id: AgentId, topic: &Topic) -> bool {
        let Some(subscribers) = self.subscriptions.get_mut(topic) else {
            return false;
        };
        let removed = subscribers.remove(&id);
        if subscribers.is_empty() {
            self.subscriptions.remove(topic);
        }
        removed
    }

    /// Subscribers of `topic` at this moment, ascending by id.
    pub fn subscribers(&self, topic: &Topic) -> Vec<AgentId> {
        self.subscriptions
            .get(topic)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Agents whose owning entity no longer exists in `world`.
    pub fn orphans(&self, world: &W) -> Vec<AgentId> {
        self.agents
            .values()
            .filter(|a| a.owner().is_some_and(|e| !world.entity_exists(e)))
            .map(|a| a.id())
            .collect()
    }
}
