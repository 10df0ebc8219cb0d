//! Periodic adjustment of the per-frame agent budget from mailbox backlog.

use crate::config::LoadBalanceConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadBalanceAction {
    IncreaseProcessing,
    DecreaseProcessing,
    Maintain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSample {
    pub overloaded_agents: usize,
    pub total_backlog: usize,
}

#[derive(Debug, Clone)]
pub struct LoadBalancer {
    config: LoadBalanceConfig,
}

impl LoadBalancer {
    pub fn new(config: LoadBalanceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoadBalanceConfig {
        &self.config
    }

    /// Whether a rebalance is due after `frame` has completed.
    pub fn is_due(&self, frame: u64) -> bool {
        self.config.enabled
            && self.config.interval_frames > 0
            && frame > 0
            && frame % self.config.interval_frames == 0
    }

    pub fn sample(&self, backlogs: impl IntoIterator<Item = usize>) -> LoadSample {
        let mut sample = LoadSample {
            overloaded_agents: 0,
            total_backlog: 0,
        };
        for backlog in backlogs {
            sample.total_backlog += backlog;
            if backlog > self.config.overload_queue_depth {
                sample.overloaded_agents += 1;
            }
        }
        sample
    }

    pub fn decide(&self, sample: LoadSample) -> LoadBalanceAction {
        if sample.overloaded_agents > self.config.overloaded_agents_threshold {
            LoadBalanceAction::IncreaseProcessing
        } else if sample.overloaded_agents == 0 && sample.total_backlog < self.config.low_load_total {
            LoadBalanceAction::DecreaseProcessing
        } else {
            LoadBalanceAction::Maintain
        }
    }

    /// New per-frame agent budget.
    ///
    /// An increase never lowers the budget and a decrease never raises it; within that, the
    /// result is kept inside `[min_agents_per_frame, max_agents_per_frame_cap]`.
    pub fn apply(&self, current: usize, action: LoadBalanceAction) -> usize {
        let min = self.config.min_agents_per_frame;
        let cap = self.config.max_agents_per_frame_cap.max(min);
        match action {
            LoadBalanceAction::IncreaseProcessing => current
                .saturating_add(self.config.increase_step)
                .min(cap)
                .max(current),
            LoadBalanceAction::DecreaseProcessing => current
                .saturating_sub(self.config.decrease_step)
                .max(min)
                .min(current),
            LoadBalanceAction::Maintain => current,
        }
    }
}
