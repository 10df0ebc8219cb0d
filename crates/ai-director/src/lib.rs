//! Frame-budgeted, single-threaded cooperative scheduler for simulation AI agents.
//!
//! The [`Director`] owns every agent, routes prioritized messages into bounded mailboxes, and on
//! each `process_frame` call services the agents most deserving of attention until the
//! per-frame agent count or wall-clock budget runs out.

#![forbid(unsafe_code)]

pub mod agent;
pub mod attention;
pub mod clock;
pub mod config;
pub mod director;
pub mod error;
pub mod inbound;
pub mod lifecycle;
pub mod load_balance;
pub mod mailbox;
pub mod metrics;
pub mod registry;
pub mod routing;

pub use agent::{Agent, AgentState, AgentSummary};
pub use attention::{AttentionScore, AttentionScorer};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{AttentionConfig, DirectorConfig, LoadBalanceConfig};
pub use director::{Director, FrameReport};
pub use error::{ConfigError, DirectorError};
pub use inbound::{InboundClosed, Injector};
pub use lifecycle::{DirectorState, StopHandle};
pub use load_balance::{LoadBalanceAction, LoadBalancer, LoadSample};
pub use mailbox::{Drained, Mailbox, PushOutcome};
pub use metrics::{MetricsRecorder, MetricsSnapshot};
pub use registry::Registry;
pub use routing::{Delivery, PostOffice, AGENT_CREATED, AGENT_DESTROYED};
