//! Director - owns the agents and services them once per simulation tick.
//!
//! Everything here runs on the caller's thread. `process_frame` is invoked from the same
//! place the rest of the simulation advances, so agent decision steps are sequenced with every
//! other mutation of the world and need no locking.

use std::collections::BTreeMap;
use std::time::Duration;

use ai_core::{
    AgentId, AgentKind, AgentLogic, EntityId, Message, Outbound, Priority, Sender, TickContext,
    Topic, WorldView,
};
use ai_tools::{NullTraceSink, TraceEvent, TraceSink};
use serde::Serialize;

use crate::agent::{Agent, AgentState, AgentSummary};
use crate::attention::{AttentionScore, AttentionScorer};
use crate::clock::{as_ms, Clock, MonotonicClock};
use crate::config::DirectorConfig;
use crate::error::DirectorError;
use crate::inbound::{InboundQueue, Injector};
use crate::lifecycle::{DirectorState, StopHandle};
use crate::load_balance::{LoadBalanceAction, LoadBalancer};
use crate::metrics::{MetricsRecorder, MetricsSnapshot};
use crate::registry::Registry;
use crate::routing::{lifecycle_notice, Delivery, PostOffice, AGENT_CREATED, AGENT_DESTROYED};

/// Outcome of one `process_frame` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameReport {
    /// Frame index the work was done under; `None` when the tick was a no-op.
    pub frame: Option<u64>,
    /// Agents serviced, in service order.
    pub serviced: Vec<AgentId>,
    /// Selected candidates left for a later frame because the time budget ran out.
    pub deferred: usize,
    pub messages_processed: usize,
    pub elapsed_ms: f64,
    pub overrun: bool,
    /// The frame ended in a stop requested through a [`StopHandle`].
    pub stopped: bool,
}

impl FrameReport {
    pub fn is_noop(&self) -> bool {
        self.frame.is_none()
    }
}

pub struct Director<W>
where
    W: WorldView + 'static,
{
    config: DirectorConfig,
    state: DirectorState,
    frame: u64,
    agents_per_frame: usize,
    registry: Registry<W>,
    post: PostOffice,
    scorer: AttentionScorer,
    balancer: LoadBalancer,
    metrics: MetricsRecorder,
    clock: Box<dyn Clock>,
    trace: Box<dyn TraceSink>,
    inbound: InboundQueue,
    stop: StopHandle,
}

impl<W> Director<W>
where
    W: WorldView + 'static,
{
    pub fn new(config: DirectorConfig) -> Result<Self, DirectorError> {
        config.validate()?;
        Ok(Self {
            state: DirectorState::Stopped,
            frame: 0,
            agents_per_frame: config.max_agents_per_frame,
            registry: Registry::new(),
            post: PostOffice::new(),
            scorer: AttentionScorer::new(config.attention.clone(), config.max_starvation_frames),
            balancer: LoadBalancer::new(config.load_balance.clone()),
            metrics: MetricsRecorder::new(),
            clock: Box::new(MonotonicClock::new()),
            trace: Box::new(NullTraceSink),
            inbound: InboundQueue::new(),
            stop: StopHandle::new(),
            config,
        })
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn set_trace_sink(&mut self, sink: Box<dyn TraceSink>) {
        self.trace = sink;
    }

    pub fn config(&self) -> &DirectorConfig {
        &self.config
    }

    pub fn state(&self) -> DirectorState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == DirectorState::Running
    }

    /// Number of frames processed so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Current per-frame agent budget (adjusted by load balancing).
    pub fn max_agents_per_frame(&self) -> usize {
        self.agents_per_frame
    }

    /// Change the per-frame agent budget. The load balancer continues from the new value.
    pub fn set_max_agents_per_frame(&mut self, agents: usize) -> Result<(), DirectorError> {
        self.retune(|config| config.max_agents_per_frame = agents)?;
        self.agents_per_frame = agents;
        Ok(())
    }

    pub fn set_frame_time_budget_ms(&mut self, budget_ms: f64) -> Result<(), DirectorError> {
        self.retune(|config| config.per_frame_time_budget_ms = budget_ms)
    }

    /// Change the per-service message budget of every registered agent and of agents created
    /// from now on. Overrides made with [`Director::set_message_budget`] are replaced.
    pub fn set_max_messages_per_agent(&mut self, messages: usize) -> Result<(), DirectorError> {
        self.retune(|config| config.max_messages_per_agent_per_frame = messages)?;
        for agent in self.registry.iter_mut() {
            agent.set_message_budget(messages);
        }
        Ok(())
    }

    /// Apply `change` to a copy of the configuration and keep it only if it still validates.
    fn retune(&mut self, change: impl FnOnce(&mut DirectorConfig)) -> Result<(), DirectorError> {
        let mut next = self.config.clone();
        change(&mut next);
        next.validate()?;
        self.config = next;
        Ok(())
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn injector(&self) -> Injector {
        self.inbound.injector()
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// `Stopped -> Initializing -> Running`.
    pub fn initialize(&mut self) -> Result<(), DirectorError> {
        if self.state != DirectorState::Stopped {
            return Err(self.invalid("initialize"));
        }
        self.transition(DirectorState::Initializing);
        self.metrics.reset();
        self.stop.clear();
        self.agents_per_frame = self.config.max_agents_per_frame;
        self.transition(DirectorState::Running);
        Ok(())
    }

    /// Bring the director to `Running` from `Stopped` or `Initializing`. No-op when running.
    pub fn start(&mut self) -> Result<(), DirectorError> {
        match self.state {
            DirectorState::Stopped => self.initialize(),
            DirectorState::Initializing => {
                self.transition(DirectorState::Running);
                Ok(())
            }
            DirectorState::Running => Ok(()),
            DirectorState::Paused | DirectorState::ShuttingDown => Err(self.invalid("start")),
        }
    }

    pub fn pause(&mut self) -> Result<(), DirectorError> {
        match self.state {
            DirectorState::Running => {
                self.transition(DirectorState::Paused);
                Ok(())
            }
            DirectorState::Paused => Ok(()),
            _ => Err(self.invalid("pause")),
        }
    }

    pub fn resume(&mut self) -> Result<(), DirectorError> {
        match self.state {
            DirectorState::Paused => {
                self.transition(DirectorState::Running);
                Ok(())
            }
            DirectorState::Running => Ok(()),
            _ => Err(self.invalid("resume")),
        }
    }

    /// `Running/Paused -> ShuttingDown -> Stopped`, releasing every agent. No-op when stopped.
    pub fn stop(&mut self) -> Result<(), DirectorError> {
        match self.state {
            DirectorState::Running | DirectorState::Paused => {}
            DirectorState::Stopped | DirectorState::ShuttingDown => return Ok(()),
            DirectorState::Initializing => return Err(self.invalid("stop")),
        }

        self.transition(DirectorState::ShuttingDown);
        let released = self.registry.ids();
        for id in &released {
            self.destroy_agent(*id);
        }
        self.stop.clear();
        self.transition(DirectorState::Stopped);
        tracing::info!(released = released.len(), "AI director stopped");
        Ok(())
    }

    fn transition(&mut self, to: DirectorState) {
        tracing::debug!(from = self.state.as_str(), to = to.as_str(), "Director state change");
        self.state = to;
    }

    fn invalid(&self, operation: &'static str) -> DirectorError {
        DirectorError::InvalidTransition {
            from: self.state,
            operation,
        }
    }

    // ------------------------------------------------------------------
    // Agents
    // ------------------------------------------------------------------

    /// Register `logic` as a new agent owned by `owner`. The agent kind is `logic.kind()`.
    pub fn create_agent(
        &mut self,
        owner: Option<EntityId>,
        logic: Box<dyn AgentLogic<W>>,
        world: &W,
    ) -> Result<AgentId, DirectorError> {
        let kind = logic.kind();
        let id = self.registry.create(
            owner,
            logic,
            world,
            self.config.mailbox_capacity_per_agent,
            self.config.max_messages_per_agent_per_frame,
            self.frame,
        )?;

        tracing::info!(agent = id.0, kind = %kind, owner = ?owner.map(|e| e.0), "Created agent");
        self.publish(lifecycle_notice(AGENT_CREATED, id, kind, owner));
        Ok(id)
    }

    /// Destroy an agent and discard its mailbox. Unknown or already destroyed ids are a no-op.
    pub fn destroy_agent(&mut self, id: AgentId) -> bool {
        let Some((agent, discarded)) = self.registry.destroy(id) else {
            return false;
        };
        tracing::info!(
            agent = id.0,
            kind = %agent.kind(),
            discarded,
            "Destroyed agent"
        );
        self.publish(lifecycle_notice(
            AGENT_DESTROYED,
            id,
            agent.kind(),
            agent.owner(),
        ));
        true
    }

    /// Destroy every agent whose owning entity has left the world.
    pub fn reap_orphans(&mut self, world: &W) -> Vec<AgentId> {
        let orphans = self.registry.orphans(world);
        for id in &orphans {
            self.destroy_agent(*id);
        }
        orphans
    }

    pub fn lookup_by_entity(&self, entity: EntityId, kind: AgentKind) -> Option<AgentId> {
        self.registry.lookup_by_entity(entity, kind)
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent<W>> {
        self.registry.get(id)
    }

    pub fn agent_state(&self, id: AgentId) -> Option<AgentState> {
        self.registry.get(id).map(|a| a.state())
    }

    pub fn agent_count(&self) -> usize {
        self.registry.len()
    }

    pub fn active_agent_count(&self) -> usize {
        self.registry.active_count()
    }

    /// Take an agent out of scheduling without destroying it.
    pub fn pause_agent(&mut self, id: AgentId) -> Result<(), DirectorError> {
        let agent = self
            .registry
            .get_mut(id)
            .ok_or(DirectorError::UnknownAgent(id))?;
        agent.pause();
        Ok(())
    }

    /// Return a paused agent to scheduling and clear its recorded fault.
    pub fn resume_agent(&mut self, id: AgentId) -> Result<(), DirectorError> {
        let agent = self
            .registry
            .get_mut(id)
            .ok_or(DirectorError::UnknownAgent(id))?;
        if agent.state() == AgentState::Paused {
            agent.activate();
        }
        Ok(())
    }

    pub fn set_message_budget(&mut self, id: AgentId, budget: usize) -> Result<(), DirectorError> {
        let agent = self
            .registry
            .get_mut(id)
            .ok_or(DirectorError::UnknownAgent(id))?;
        agent.set_message_budget(budget);
        Ok(())
    }

    pub fn subscribe(&mut self, id: AgentId, topic: impl Into<Topic>) -> Result<(), DirectorError> {
        self.registry.subscribe(id, topic.into())
    }

    pub fn unsubscribe(&mut self, id: AgentId, topic: &Topic) -> bool {
        self.registry.unsubscribe(id, topic)
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    /// Publish a system-originated message.
    pub fn publish(&mut self, outbound: Outbound) -> Delivery {
        self.publish_as(Sender::System, outbound)
    }

    pub fn publish_as(&mut self, sender: Sender, outbound: Outbound) -> Delivery {
        self.post.publish(
            &mut self.registry,
            sender,
            self.frame,
            outbound,
            &mut self.metrics,
            self.trace.as_mut(),
        )
    }

    /// Move everything sent through an [`Injector`] into mailboxes.
    pub fn pump_inbound(&mut self) -> usize {
        let pending: Vec<Outbound> = self.inbound.try_iter().collect();
        let count = pending.len();
        for outbound in pending {
            self.publish(outbound);
        }
        count
    }

    pub fn pending_inbound(&self) -> usize {
        self.inbound.len()
    }

    /// Topic messages destined for domain systems, in publish order.
    pub fn drain_boundary(&mut self) -> Vec<Message> {
        self.post.drain_boundary()
    }

    pub fn queued_messages(&self) -> usize {
        self.registry.queued_messages()
    }

    /// Ordered candidate list the scheduler would use right now.
    pub fn candidates(&self) -> Vec<AttentionScore> {
        self.scorer
            .select_candidates(self.registry.iter(), self.agents_per_frame)
    }

    // ------------------------------------------------------------------
    // Frame
    // ------------------------------------------------------------------

    /// Service agents for one simulation tick.
    ///
    /// Agents are taken in attention order until the per-frame agent count or time budget is
    /// exhausted. The first candidate is always serviced. Candidates left over keep their
    /// staleness and are reconsidered next frame.
    pub fn process_frame(&mut self, dt_seconds: f32, world: &mut W) -> FrameReport {
        if self.state.accepts_inbound() {
            self.pump_inbound();
        }
        if self.state != DirectorState::Running {
            return FrameReport::default();
        }

        let frame = self.frame;
        let frame_start = self.clock.now();
        let budget = Duration::from_secs_f64(self.config.per_frame_time_budget_ms / 1000.0);

        let candidates = self
            .scorer
            .select_candidates(self.registry.iter(), self.agents_per_frame);

        let mut report = FrameReport {
            frame: Some(frame),
            ..FrameReport::default()
        };

        for (index, candidate) in candidates.iter().enumerate() {
            if self.stop.is_requested() {
                report.deferred = candidates.len() - index;
                break;
            }

            if candidate.starving {
                self.trace.emit(
                    TraceEvent::new(frame, "director.starve")
                        .with_a(candidate.agent.stable_id())
                        .with_b(candidate.frames_since_service),
                );
            }

            if let Some(messages) = self.service_agent(candidate.agent, dt_seconds, world) {
                report.serviced.push(candidate.agent);
                report.messages_processed += messages;
            }

            if self.clock.now().saturating_sub(frame_start) > budget {
                report.overrun = true;
                let rest = &candidates[index + 1..];
                report.deferred = rest.len();
                for deferred in rest {
                    self.trace.emit(
                        TraceEvent::new(frame, "director.defer")
                            .with_a(deferred.agent.stable_id())
                            .with_b(deferred.frames_since_service),
                    );
                }
                break;
            }
        }

        for agent in self.registry.iter_mut() {
            if agent.is_active() && agent.last_serviced_frame() != Some(frame) {
                agent.mark_skipped();
            }
        }

        let elapsed_ms = as_ms(self.clock.now().saturating_sub(frame_start));
        report.elapsed_ms = elapsed_ms;
        self.frame += 1;
        self.metrics
            .record_frame(elapsed_ms, report.overrun, report.deferred);

        if report.overrun {
            tracing::debug!(
                frame,
                elapsed_ms,
                budget_ms = self.config.per_frame_time_budget_ms,
                deferred = report.deferred,
                "Frame budget exceeded"
            );
        }

        if self.balancer.is_due(self.frame) {
            self.rebalance();
        }

        if self.stop.is_requested() {
            report.stopped = self.stop().is_ok();
        }

        report
    }

    /// Drain, decide, and route for one agent. Returns the number of messages handed to the
    /// agent, or `None` if the agent disappeared.
    fn service_agent(&mut self, id: AgentId, dt_seconds: f32, world: &mut W) -> Option<usize> {
        let frame = self.frame;
        let start = self.clock.now();

        let agent = self.registry.get_mut(id)?;
        let kind = agent.kind();
        let budget = agent.message_budget();
        let drained = agent.mailbox.drain(budget, frame);
        let consumed = drained.messages.len();
        let ctx = TickContext::new(frame, dt_seconds, id, agent.owner());

        let result = agent.logic.update(&ctx, drained.messages, world);
        agent.mark_serviced(frame);

        self.metrics.record_expired(drained.expired);

        match result {
            Ok(outbound) => {
                for message in outbound {
                    self.publish_as(Sender::Agent(id), message);
                }
            }
            Err(error) => {
                tracing::warn!(
                    agent = id.0,
                    kind = %kind,
                    error = %error,
                    "Agent decision step failed; pausing agent"
                );
                if let Some(agent) = self.registry.get_mut(id) {
                    agent.fail(error);
                }
                self.metrics.record_fault();
                self.trace
                    .emit(TraceEvent::new(frame, "director.fault").with_a(id.stable_id()));
            }
        }

        let elapsed = self.clock.now().saturating_sub(start);
        self.metrics.record_service(kind, as_ms(elapsed), consumed);
        self.trace.emit(
            TraceEvent::new(frame, "director.service")
                .with_a(id.stable_id())
                .with_b(u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX)),
        );
        Some(consumed)
    }

    fn rebalance(&mut self) {
        let sample = self
            .balancer
            .sample(self.registry.iter().map(|a| a.mailbox().len()));
        let action = self.balancer.decide(sample);
        if action == LoadBalanceAction::Maintain {
            return;
        }
        let next = self.balancer.apply(self.agents_per_frame, action);
        if next != self.agents_per_frame {
            tracing::info!(
                from = self.agents_per_frame,
                to = next,
                overloaded = sample.overloaded_agents,
                backlog = sample.total_backlog,
                "Adjusted agents per frame"
            );
            self.agents_per_frame = next;
        }
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    /// Read-only statistics snapshot.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics
            .snapshot(self.registry.active_count(), self.registry.queued_messages())
    }

    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }

    /// Messages waiting across all mailboxes, per priority tier.
    pub fn queued_by_priority(&self) -> BTreeMap<Priority, usize> {
        let mut totals: BTreeMap<Priority, usize> = Priority::ALL.iter().map(|&p| (p, 0)).collect();
        for agent in self.registry.iter() {
            for (priority, count) in agent.mailbox().counts() {
                *totals.entry(priority).or_default() += count;
            }
        }
        totals
    }

    pub fn agent_summaries(&self) -> Vec<AgentSummary> {
        self.registry.iter().map(|a| a.summary()).collect()
    }

    /// Each agent's own `serialize()` output keyed by agent id.
    pub fn snapshot_agents(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .registry
            .iter()
            .map(|a| {
                (
                    a.id().0.to_string(),
                    serde_json::json!({
                        "kind": a.kind().as_str(),
                        "state": a.summary().state,
                        "logic": a.logic().serialize(),
                    }),
                )
            })
            .collect();
        serde_json::Value::Object(map)
    }

    pub fn performance_report(&self) -> Vec<String> {
        let m = self.metrics();
        let mut report = vec![
            "=== AI Director Performance ===".to_string(),
            format!("State: {}", self.state.as_str()),
            format!("Active Agents: {}", m.active_agents),
            format!("Total Agents: {}", self.registry.len()),
            format!("Total Frames: {}", m.total_frames),
            format!("Messages Processed: {}", m.messages_processed),
            format!("Avg Frame Time: {:.3} ms", m.average_frame_time_ms),
            format!("Smoothed Frame Time: {:.3} ms", m.smoothed_frame_time_ms),
            format!("Max Frame Time: {:.3} ms", m.max_frame_time_ms),
            format!(
                "Frame Time Budget: {:.3} ms",
                self.config.per_frame_time_budget_ms
            ),
            format!("Budget Overruns: {}", m.budget_overruns),
            format!("Deferred Services: {}", m.deferred_services),
            format!("Queued Messages: {}", m.queued_messages),
            format!(
                "Queued by Priority: {}",
                self.queued_by_priority()
                    .iter()
                    .map(|(p, n)| format!("{}={n}", p.as_str()))
                    .collect::<Vec<_>>()
                    .join(" ")
            ),
            format!("Mailbox Drops: {}", m.mailbox_drop_count),
            format!("Expired Messages: {}", m.expired_count),
            format!("Undeliverable Messages: {}", m.undeliverable_count),
            format!("Faulted Agents: {}", m.faulted_agents),
            format!("Max Agents/Frame: {}", self.agents_per_frame),
            format!(
                "Max Messages/Agent: {}",
                self.config.max_messages_per_agent_per_frame
            ),
        ];
        for (kind, avg) in &m.per_agent_type_average_ms {
            report.push(format!("Avg {kind} Service: {avg:.3} ms"));
        }
        report
    }
}
