#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use ai_core::{
    AgentKind, AgentLogic, DecisionError, EntityId, Message, Outbound, TickContext, WorldView,
};
use ai_director::{DirectorConfig, ManualClock};

#[derive(Debug, Default)]
pub struct TestWorld {
    pub entities: BTreeSet<EntityId>,
}

impl TestWorld {
    pub fn with_entities(ids: impl IntoIterator<Item = u64>) -> Self {
        Self {
            entities: ids.into_iter().map(EntityId).collect(),
        }
    }
}

impl WorldView for TestWorld {
    fn entity_exists(&self, entity: EntityId) -> bool {
        self.entities.contains(&entity)
    }
}

/// One recorded service: frame plus the payloads received, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Visit {
    pub frame: u64,
    pub inbox: Vec<serde_json::Value>,
}

pub type Journal = Rc<RefCell<Vec<Visit>>>;

/// Agent logic driven entirely by the test.
pub struct Scripted {
    pub kind: AgentKind,
    pub journal: Journal,
    pub cost_ms: f64,
    pub clock: Option<ManualClock>,
    pub reply: Vec<Outbound>,
    pub fail: bool,
}

impl Scripted {
    pub fn new(kind: AgentKind) -> Self {
        Self {
            kind,
            journal: Journal::default(),
            cost_ms: 0.0,
            clock: None,
            reply: Vec::new(),
            fail: false,
        }
    }

    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    pub fn costing(mut self, clock: &ManualClock, ms: f64) -> Self {
        self.clock = Some(clock.clone());
        self.cost_ms = ms;
        self
    }

    pub fn replying(mut self, outbound: Outbound) -> Self {
        self.reply.push(outbound);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

impl AgentLogic<TestWorld> for Scripted {
    fn kind(&self) -> AgentKind {
        self.kind
    }

    fn update(
        &mut self,
        ctx: &TickContext,
        inbox: Vec<Message>,
        _world: &mut TestWorld,
    ) -> Result<Vec<Outbound>, DecisionError> {
        self.journal.borrow_mut().push(Visit {
            frame: ctx.frame,
            inbox: inbox.iter().map(|m| m.payload().clone()).collect(),
        });
        if let Some(clock) = &self.clock {
            clock.advance_ms(self.cost_ms);
        }
        if self.fail {
            return Err(DecisionError::failed("scripted failure"));
        }
        Ok(std::mem::take(&mut self.reply))
    }

    fn serialize(&self) -> serde_json::Value {
        serde_json::json!({ "visits": self.journal.borrow().len() })
    }
}

/// Defaults with periodic load balancing off, so any positive agent budget is accepted and
/// held fixed.
pub fn quiet_config() -> DirectorConfig {
    let mut config = DirectorConfig::default();
    config.load_balance.enabled = false;
    config
}
