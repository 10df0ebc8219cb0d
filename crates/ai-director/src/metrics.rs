//! Per-frame and per-agent-type timing and throughput statistics.

use std::collections::BTreeMap;

use ai_core::AgentKind;
use serde::{Deserialize, Serialize};

/// Smoothing factor for the exponential moving average of frame time.
const FRAME_EMA_ALPHA: f64 = 0.1;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct KindTiming {
    services: u64,
    total_ms: f64,
}

#[derive(Debug, Clone, Default)]
pub struct MetricsRecorder {
    total_frames: u64,
    total_frame_ms: f64,
    max_frame_ms: f64,
    smoothed_frame_ms: f64,
    last_frame_ms: f64,
    per_kind: BTreeMap<AgentKind, KindTiming>,
    mailbox_drops: u64,
    expired: u64,
    undeliverable: u64,
    messages_processed: u64,
    budget_overruns: u64,
    deferred_services: u64,
    faulted_agents: u64,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn record_service(&mut self, kind: AgentKind, elapsed_ms: f64, messages: usize) {
        let timing = self.per_kind.entry(kind).or_default();
        timing.services += 1;
        timing.total_ms += elapsed_ms;
        self.messages_processed += messages as u64;
    }

    pub fn record_frame(&mut self, elapsed_ms: f64, overrun: bool, deferred: usize) {
        if self.total_frames == 0 {
            self.smoothed_frame_ms = elapsed_ms;
        } else {
            self.smoothed_frame_ms =
                FRAME_EMA_ALPHA * elapsed_ms + (1.0 - FRAME_EMA_ALPHA) * self.smoothed_frame_ms;
        }
        self.total_frames += 1;
        self.total_frame_ms += elapsed_ms;
        self.last_frame_ms = elapsed_ms;
        self.max_frame_ms = self.max_frame_ms.max(elapsed_ms);
        if overrun {
            self.budget_overruns += 1;
        }
        self.deferred_services += deferred as u64;
    }

    pub fn record_drop(&mut self) {
        self.mailbox_drops += 1;
    }

    pub fn record_expired(&mut self, count: usize) {
        self.expired += count as u64;
    }

    pub fn record_undeliverable(&mut self) {
        self.undeliverable += 1;
    }

    pub fn record_fault(&mut self) {
        self.faulted_agents += 1;
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn last_frame_ms(&self) -> f64 {
        self.last_frame_ms
    }

    pub fn snapshot(&self, active_agents: usize, queued_messages: usize) -> MetricsSnapshot {
        let average_frame_time_ms = if self.total_frames == 0 {
            0.0
        } else {
            self.total_frame_ms / self.total_frames as f64
        };

        let per_agent_type_average_ms = self
            .per_kind
            .iter()
            .map(|(kind, t)| {
                let avg = if t.services == 0 {
                    0.0
                } else {
                    t.total_ms / t.services as f64
                };
                (*kind, avg)
            })
            .collect();

        MetricsSnapshot {
            total_frames: self.total_frames,
            average_frame_time_ms,
            smoothed_frame_time_ms: self.smoothed_frame_ms,
            max_frame_time_ms: self.max_frame_ms,
            per_agent_type_average_ms,
            mailbox_drop_count: self.mailbox_drops,
            expired_count: self.expired,
            undeliverable_count: self.undeliverable,
            messages_processed: self.messages_processed,
            budget_overruns: self.budget_overruns,
            deferred_services: self.deferred_services,
            faulted_agents: self.faulted_agents,
            active_agents,
            queued_messages,
        }
    }
}

/// Read-only copy of the director's statistics, safe to take between frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_frames: u64,
    pub average_frame_time_ms: f64,
    pub smoothed_frame_time_ms: f64,
    pub max_frame_time_ms: f64,
    pub per_agent_type_average_ms: BTreeMap<AgentKind, f64>,
    pub mailbox_drop_count: u64,
    pub expired_count: u64,
    pub undeliverable_count: u64,
    pub messages_processed: u64,
    pub budget_overruns: u64,
    pub deferred_services: u64,
    pub faulted_agents: u64,
    pub active_agents: usize,
    pub queued_messages: usize,
}

impl MetricsSnapshot {
    pub fn summary(&self) -> String {
        format!(
            "Frames: {}, Avg: {:.3}ms, Max: {:.3}ms, Active: {}, Queued: {}, Dropped: {}",
            self.total_frames,
            self.average_frame_time_ms,
            self.max_frame_time_ms,
            self.active_agents,
            self.queued_messages,
            self.mailbox_drop_count
        )
    }
}
