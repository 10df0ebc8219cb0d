//! Message stamping and delivery into mailboxes and the external boundary.

use ai_core::{Address, AgentId, AgentKind, EntityId, Message, Outbound, Sender, Topic, WorldView};
use ai_tools::{TraceEvent, TraceSink};
use serde_json::json;

use crate::mailbox::PushOutcome;
use crate::metrics::MetricsRecorder;
use crate::registry::Registry;

pub const AGENT_CREATED: Topic = Topic::from_static("ai.agent.created");
pub const AGENT_DESTROYED: Topic = Topic::from_static("ai.agent.destroyed");

/// Result of one publish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Mailboxes the message was queued in.
    pub delivered: usize,
    /// Messages dropped by mailbox overflow as a consequence of this publish.
    pub dropped: usize,
    /// Whether the message was also handed to the external boundary.
    pub boundary: bool,
}

/// Stamps outbound messages with a global arrival number and routes them.
#[derive(Debug, Default)]
pub struct PostOffice {
    next_seq: u64,
    boundary: Vec<Message>,
}

impl PostOffice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish<W>(
        &mut self,
        registry: &mut Registry<W>,
        sender: Sender,
        frame: u64,
        outbound: Outbound,
        metrics: &mut MetricsRecorder,
        trace: &mut dyn TraceSink,
    ) -> Delivery
    where
        W: WorldView + 'static,
    {
        let message = Message::stamp(self.next_seq, sender, frame, outbound);
        self.next_seq += 1;

        let mut delivery = Delivery::default();
        match message.address().clone() {
            Address::Agent(recipient) => {
                deliver(registry, recipient, message, frame, metrics, trace, &mut delivery);
            }
            Address::Topic(topic) => {
                // Fan out to the subscribers present right now; later subscribers miss it.
                for recipient in registry.subscribers(&topic) {
                    if sender == Sender::Agent(recipient) {
                        continue;
                    }
                    deliver(
                        registry,
                        recipient,
                        message.clone(),
                        frame,
                        metrics,
                        trace,
                        &mut delivery,
                    );
                }
                self.boundary.push(message);
                delivery.boundary = true;
            }
        }
        delivery
    }

    /// Topic messages accumulated since the last drain, in publish order.
    pub fn drain_boundary(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.boundary)
    }

    pub fn pending_boundary(&self) -> usize {
        self.boundary.len()
    }
}

fn deliver<W>(
    registry: &mut Registry<W>,
    recipient: AgentId,
    message: Message,
    frame: u64,
    metrics: &mut MetricsRecorder,
    trace: &mut dyn TraceSink,
    delivery: &mut Delivery,
) where
    W: WorldView + 'static,
{
    let Some(agent) = registry.get_mut(recipient) else {
        metrics.record_undeliverable();
        tracing::trace!(agent = recipient.0, seq = message.seq(), "Undeliverable message");
        return;
    };

    let outcome = agent.mailbox.push(message);
    delivery.delivered += 1;
    if let Some(victim) = outcome.dropped() {
        metrics.record_drop();
        delivery.dropped += 1;
        trace.emit(
            TraceEvent::new(frame, "director.evict")
                .with_a(recipient.stable_id())
                .with_b(victim.seq()),
        );
        if matches!(outcome, PushOutcome::Rejected(_)) {
            delivery.delivered -= 1;
        }
    }
}

pub(crate) fn lifecycle_notice(
    topic: Topic,
    agent: AgentId,
    kind: AgentKind,
    owner: Option<EntityId>,
) -> Outbound {
    Outbound::to_topic(
        topic,
        json!({
            "agent": agent.0,
            "kind": kind.as_str(),
            "owner": owner.map(|e| e.0),
        }),
    )
}
