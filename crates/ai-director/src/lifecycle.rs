//! Director run state and cooperative stop requests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// `Stopped -> Initializing -> Running <-> Paused -> ShuttingDown -> Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectorState {
    Stopped,
    Initializing,
    Running,
    Paused,
    ShuttingDown,
}

impl DirectorState {
    pub fn as_str(self) -> &'static str {
        match self {
            DirectorState::Stopped => "STOPPED",
            DirectorState::Initializing => "INITIALIZING",
            DirectorState::Running => "RUNNING",
            DirectorState::Paused => "PAUSED",
            DirectorState::ShuttingDown => "SHUTTING_DOWN",
        }
    }

    /// Whether mailboxes accept the inbound channel's messages in this state.
    pub fn accepts_inbound(self) -> bool {
        matches!(self, DirectorState::Running | DirectorState::Paused)
    }
}

/// Requests a stop that takes effect between agent services, never in the middle of one.
///
/// The flag is shareable across threads; the stop itself always runs on the scheduling
/// thread at the end of the current frame.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    requested: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    pub(crate) fn clear(&self) {
        self.requested.store(false, Ordering::SeqCst);
    }
}
