//! Agent, message, and world-boundary vocabulary shared by the AI director and agent
//! implementations.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod agent;
pub mod message;
pub mod tick;
pub mod world;

pub use agent::{AgentId, AgentKind, AgentLogic, DecisionError, EntityId};
pub use message::{Address, Message, Outbound, Priority, Sender, Topic};
pub use tick::TickContext;
pub use world::WorldView;
