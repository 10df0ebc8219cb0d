//! Per-frame scheduling priority for agents.
//!
//! Scores are derived fresh every frame and never stored. Ordering is fully deterministic:
//! equal scores fall back to the oldest service and then to the agent id.

use std::cmp::Ordering;

use ai_core::{AgentId, Priority, WorldView};

use crate::agent::Agent;
use crate::config::AttentionConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttentionScore {
    pub agent: AgentId,
    pub score: f64,
    /// The highest pending message is `Urgent`.
    pub urgent: bool,
    /// Pending work and unserviced for at least the starvation bound.
    pub starving: bool,
    pub backlog: usize,
    pub frames_since_service: u64,
    pub last_serviced_frame: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AttentionScorer {
    config: AttentionConfig,
    max_starvation_frames: u64,
}

impl AttentionScorer {
    pub fn new(config: AttentionConfig, max_starvation_frames: u64) -> Self {
        Self {
            config,
            max_starvation_frames: max_starvation_frames.max(1),
        }
    }

    pub fn config(&self) -> &AttentionConfig {
        &self.config
    }

    pub fn max_starvation_frames(&self) -> u64 {
        self.max_starvation_frames
    }

    pub fn score<W>(&self, agent: &Agent<W>) -> AttentionScore
    where
        W: WorldView + 'static,
    {
        let mailbox = agent.mailbox();
        let backlog = mailbox.len();
        let high = mailbox.count(Priority::High);
        let staleness = agent.frames_since_service();

        let score = self.config.type_weight(agent.kind())
            + self.config.backlog_weight * backlog as f64
            + self.config.high_weight * high as f64
            + self.config.staleness_weight * staleness as f64;

        AttentionScore {
            agent: agent.id(),
            score: if score.is_nan() { f64::NEG_INFINITY } else { score },
            urgent: mailbox.highest_priority() == Some(Priority::Urgent),
            starving: backlog > 0 && staleness >= self.max_starvation_frames,
            backlog,
            frames_since_service: staleness,
            last_serviced_frame: agent.last_serviced_frame(),
        }
    }

    /// Active agents in service order, at most `max_count` of them.
    ///
    /// Starving agents come first (stalest first), then agents holding an `Urgent` message,
    /// then everyone else by score.
    pub fn select_candidates<'a, W, I>(&self, agents: I, max_count: usize) -> Vec<AttentionScore>
    where
        W: WorldView + 'static,
        I: IntoIterator<Item = &'a Agent<W>>,
    {
        let mut scored: Vec<AttentionScore> = agents
            .into_iter()
            .filter(|a| a.is_active())
            .map(|a| self.score(a))
            .collect();

        scored.sort_by(compare_candidates);
        scored.truncate(max_count);
        scored
    }
}

/// `Less` means "serve first".
pub fn compare_candidates(a: &AttentionScore, b: &AttentionScore) -> Ordering {
    b.starving
        .cmp(&a.starving)
        .then_with(|| {
            if a.starving && b.starving {
                b.frames_since_service.cmp(&a.frames_since_service)
            } else {
                Ordering::Equal
            }
        })
        .then_with(|| b.urgent.cmp(&a.urgent))
        .then_with(|| b.score.total_cmp(&a.score))
        .then_with(|| a.last_serviced_frame.cmp(&b.last_serviced_frame))
        .then_with(|| a.agent.cmp(&b.agent))
}
