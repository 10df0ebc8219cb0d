//! Synthetic realm used to exercise the director from the command line.
//!
//! Nations raise diplomatic tension, councils answer it with advice, and characters spread
//! rumours about the court. Every agent is owned by a world entity; entities are removed over
//! time so the run also covers dangling owners and orphan reaping.

use std::collections::{BTreeMap, BTreeSet};

use ai_core::{
    AgentKind, AgentLogic, DecisionError, EntityId, Message, Outbound, Priority, Sender,
    TickContext, Topic, WorldView,
};
use serde_json::json;

use crate::rng::SplitMix64;

pub const TENSION: Topic = Topic::from_static("diplomacy.tension");
pub const RUMOR: Topic = Topic::from_static("court.rumor");
pub const HARVEST: Topic = Topic::from_static("economy.harvest");

#[derive(Debug, Default)]
pub struct DemoWorld {
    entities: BTreeSet<EntityId>,
    treasury: BTreeMap<EntityId, i64>,
    next_entity: u64,
}

impl DemoWorld {
    pub fn new() -> Self {
        Self {
            next_entity: 1,
            ..Self::default()
        }
    }

    pub fn spawn_entity(&mut self) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        self.entities.insert(id);
        id
    }

    pub fn remove_entity(&mut self, entity: EntityId) -> bool {
        self.treasury.remove(&entity);
        self.entities.remove(&entity)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn treasury(&self, entity: EntityId) -> i64 {
        self.treasury.get(&entity).copied().unwrap_or(0)
    }

    fn deposit(&mut self, entity: EntityId, amount: i64) {
        *self.treasury.entry(entity).or_default() += amount;
    }
}

impl WorldView for DemoWorld {
    fn entity_exists(&self, entity: EntityId) -> bool {
        self.entities.contains(&entity)
    }
}

fn owner_of(ctx: &TickContext, world: &DemoWorld) -> Result<EntityId, DecisionError> {
    let owner = ctx
        .owner
        .ok_or_else(|| DecisionError::failed("agent has no owning entity"))?;
    if world.entity_exists(owner) {
        Ok(owner)
    } else {
        Err(DecisionError::DanglingEntity(owner))
    }
}

pub struct NationMind {
    rng: SplitMix64,
    tension: i64,
    advice_taken: u64,
}

impl NationMind {
    pub fn new(rng: SplitMix64) -> Self {
        Self {
            rng,
            tension: 0,
            advice_taken: 0,
        }
    }
}

impl AgentLogic<DemoWorld> for NationMind {
    fn kind(&self) -> AgentKind {
        AgentKind::Nation
    }

    fn update(
        &mut self,
        ctx: &TickContext,
        inbox: Vec<Message>,
        world: &mut DemoWorld,
    ) -> Result<Vec<Outbound>, DecisionError> {
        let realm = owner_of(ctx, world)?;

        for message in &inbox {
            match message.topic() {
                Some(topic) if *topic == HARVEST => {
                    let payload = message.payload();
                    if payload["realm"].as_u64() == Some(realm.0) {
                        world.deposit(realm, payload["yield"].as_i64().unwrap_or(0));
                    }
                }
                Some(topic) if *topic == RUMOR => self.tension += 1,
                Some(_) => {}
                None => {
                    self.advice_taken += 1;
                    self.tension = (self.tension - 2).max(0);
                }
            }
        }

        let mut out = Vec::new();
        if self.rng.chance(0.2) {
            self.tension += self.rng.below(3) as i64;
            let priority = if self.tension > 8 {
                Priority::Urgent
            } else {
                Priority::Normal
            };
            out.push(
                Outbound::to_topic(TENSION, json!({ "realm": realm.0, "level": self.tension }))
                    .with_priority(priority),
            );
        }
        Ok(out)
    }

    fn serialize(&self) -> serde_json::Value {
        json!({ "tension": self.tension, "advice_taken": self.advice_taken })
    }
}

#[derive(Debug, Default)]
pub struct CouncilMind {
    sessions: u64,
}

impl CouncilMind {
    pub fn new() -> Self {
        Self { sessions: 0 }
    }
}

impl AgentLogic<DemoWorld> for CouncilMind {
    fn kind(&self) -> AgentKind {
        AgentKind::Council
    }

    fn update(
        &mut self,
        ctx: &TickContext,
        inbox: Vec<Message>,
        world: &mut DemoWorld,
    ) -> Result<Vec<Outbound>, DecisionError> {
        owner_of(ctx, world)?;

        let mut out = Vec::new();
        for message in inbox {
            let Sender::Agent(nation) = message.sender() else {
                continue;
            };
            let level = message.payload()["level"].as_i64().unwrap_or(0);
            if level > 3 {
                self.sessions += 1;
                out.push(
                    Outbound::to_agent(nation, json!({ "advice": "negotiate", "level": level }))
                        .with_priority(Priority::High)
                        .with_ttl(30),
                );
            }
        }
        Ok(out)
    }

    fn serialize(&self) -> serde_json::Value {
        json!({ "sessions": self.sessions })
    }
}

pub struct CharacterMind {
    rng: SplitMix64,
    rumors: u64,
}

impl CharacterMind {
    pub fn new(rng: SplitMix64) -> Self {
        Self { rng, rumors: 0 }
    }
}

impl AgentLogic<DemoWorld> for CharacterMind {
    fn kind(&self) -> AgentKind {
        AgentKind::Character
    }

    fn update(
        &mut self,
        ctx: &TickContext,
        _inbox: Vec<Message>,
        world: &mut DemoWorld,
    ) -> Result<Vec<Outbound>, DecisionError> {
        let person = owner_of(ctx, world)?;

        if self.rng.chance(0.05) {
            self.rumors += 1;
            return Ok(vec![Outbound::to_topic(
                RUMOR,
                json!({ "about": person.0, "frame": ctx.frame }),
            )
            .with_priority(Priority::Low)
            .with_ttl(60)]);
        }
        Ok(Vec::new())
    }

    fn serialize(&self) -> serde_json::Value {
        json!({ "rumors": self.rumors })
    }
}
