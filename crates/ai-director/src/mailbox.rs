//! Capacity-bounded, priority-ordered message holding area for one agent.

use std::collections::{BTreeMap, VecDeque};

use ai_core::{Message, Priority};

/// What happened to a message handed to [`Mailbox::push`].
#[derive(Debug, Clone, PartialEq)]
pub enum PushOutcome {
    Queued,
    /// The mailbox was full; this older message was evicted to make room.
    Evicted(Message),
    /// The mailbox was full and the incoming message was itself the lowest-priority entry.
    Rejected(Message),
}

impl PushOutcome {
    pub fn dropped(&self) -> Option<&Message> {
        match self {
            PushOutcome::Queued => None,
            PushOutcome::Evicted(m) | PushOutcome::Rejected(m) => Some(m),
        }
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct Drained {
    pub messages: Vec<Message>,
    /// Messages discarded because their time-to-live ran out.
    pub expired: usize,
}

/// One FIFO per priority tier. Drain order is `(priority desc, arrival asc)`.
#[derive(Debug)]
pub struct Mailbox {
    capacity: usize,
    tiers: [VecDeque<Message>; 4],
    len: usize,
}

impl Mailbox {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            tiers: Default::default(),
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn count(&self, priority: Priority) -> usize {
        self.tiers[priority.index()].len()
    }

    /// Queued messages per tier, every tier present.
    pub fn counts(&self) -> BTreeMap<Priority, usize> {
        Priority::ALL.iter().map(|&p| (p, self.count(p))).collect()
    }

    pub fn highest_priority(&self) -> Option<Priority> {
        Priority::ALL
            .iter()
            .rev()
            .copied()
            .find(|p| !self.tiers[p.index()].is_empty())
    }

    pub fn has_urgent(&self) -> bool {
        self.count(Priority::Urgent) > 0
    }

    pub fn push(&mut self, message: Message) -> PushOutcome {
        if self.len < self.capacity {
            self.tiers[message.priority().index()].push_back(message);
            self.len += 1;
            return PushOutcome::Queued;
        }

        // Full: evict the oldest entry of the lowest tier, counting the incoming message.
        let incoming = message.priority().index();
        let lowest_present = self
            .tiers
            .iter()
            .position(|tier| !tier.is_empty())
            .unwrap_or(incoming);

        if incoming < lowest_present {
            return PushOutcome::Rejected(message);
        }

        let victim = self.tiers[lowest_present].pop_front();
        self.tiers[incoming].push_back(message);
        match victim {
            Some(victim) => PushOutcome::Evicted(victim),
            None => {
                self.len += 1;
                PushOutcome::Queued
            }
        }
    }

    /// Remove up to `max` live messages, highest priority first.
    pub fn drain(&mut self, max: usize, frame: u64) -> Drained {
        let mut drained = Drained::default();
        for tier in self.tiers.iter_mut().rev() {
            while drained.messages.len() < max {
                let Some(message) = tier.pop_front() else {
                    break;
                };
                self.len -= 1;
                if message.is_expired(frame) {
                    drained.expired += 1;
                } else {
                    drained.messages.push(message);
                }
            }
            if drained.messages.len() >= max {
                break;
            }
        }
        drained
    }

    /// Discard everything, returning how many messages were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.len;
        for tier in &mut self.tiers {
            tier.clear();
        }
        self.len = 0;
        dropped
    }

    /// Pending messages in drain order.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.tiers.iter().rev().flat_map(|tier| tier.iter())
    }
}
