//! Umbrella crate that re-exports the `ai-*` building blocks.
//!
//! `core` carries the agent and message vocabulary, `tools` the trace sinks, and `director` the
//! frame-budgeted scheduler that ties them together.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

#[cfg(feature = "core")]
#[cfg_attr(docsrs, doc(cfg(feature = "core")))]
pub use ai_core as core;

#[cfg(feature = "tools")]
#[cfg_attr(docsrs, doc(cfg(feature = "tools")))]
pub use ai_tools as tools;

#[cfg(feature = "director")]
#[cfg_attr(docsrs, doc(cfg(feature = "director")))]
pub use ai_director as director;

/// Commonly used items for implementing agents and driving a director.
#[cfg(feature = "director")]
#[cfg_attr(docsrs, doc(cfg(feature = "director")))]
pub mod prelude {
    pub use ai_core::{
        AgentId, AgentKind, AgentLogic, DecisionError, EntityId, Message, Outbound, Priority,
        TickContext, Topic, WorldView,
    };
    pub use ai_director::{Director, DirectorConfig, DirectorState, FrameReport};
}
