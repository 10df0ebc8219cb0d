use core::fmt;
use std::borrow::Cow;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::AgentId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    /// Lowest first.
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Normal,
        Priority::High,
        Priority::Urgent,
    ];

    pub fn index(self) -> usize {
        match self {
            Priority::Low => 0,
            Priority::Normal => 1,
            Priority::High => 2,
            Priority::Urgent => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Sender {
    /// Originated outside any agent (domain systems, the director itself).
    System,
    Agent(AgentId),
}

/// Broadcast channel name, e.g. `"diplomacy.war_declared"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Topic(Cow<'static, str>);

impl Topic {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Topic {
    fn from(value: &'static str) -> Self {
        Self::from_static(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Address {
    Agent(AgentId),
    Topic(Topic),
}

/// A message as requested by its producer, before the director stamps it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Outbound {
    pub to: Address,
    pub priority: Priority,
    pub payload: serde_json::Value,
    /// Frames the message stays deliverable after creation.
    pub ttl_frames: Option<u64>,
}

impl Outbound {
    pub fn new(to: Address, payload: serde_json::Value) -> Self {
        Self {
            to,
            priority: Priority::Normal,
            payload,
            ttl_frames: None,
        }
    }

    pub fn to_agent(agent: AgentId, payload: serde_json::Value) -> Self {
        Self::new(Address::Agent(agent), payload)
    }

    pub fn to_topic(topic: impl Into<Topic>, payload: serde_json::Value) -> Self {
        Self::new(Address::Topic(topic.into()), payload)
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_ttl(mut self, frames: u64) -> Self {
        self.ttl_frames = Some(frames);
        self
    }
}

/// Immutable unit of communication.
///
/// Only the director creates messages, so `seq` is a global arrival number: two messages with
/// the same priority are always drained in `seq` order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Message {
    seq: u64,
    sender: Sender,
    address: Address,
    priority: Priority,
    payload: serde_json::Value,
    created_frame: u64,
    ttl_frames: Option<u64>,
}

impl Message {
    pub fn stamp(seq: u64, sender: Sender, created_frame: u64, outbound: Outbound) -> Self {
        Self {
            seq,
            sender,
            address: outbound.to,
            priority: outbound.priority,
            payload: outbound.payload,
            created_frame,
            ttl_frames: outbound.ttl_frames,
        }
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn topic(&self) -> Option<&Topic> {
        match &self.address {
            Address::Topic(topic) => Some(topic),
            Address::Agent(_) => None,
        }
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    pub fn created_frame(&self) -> u64 {
        self.created_frame
    }

    pub fn ttl_frames(&self) -> Option<u64> {
        self.ttl_frames
    }

    pub fn is_expired(&self, frame: u64) -> bool {
        match self.ttl_frames {
            Some(ttl) => frame.saturating_sub(self.created_frame) > ttl,
            None => false,
        }
    }
}
