//! Tooling primitives for the AI director.
//!
//! This crate is intentionally lightweight and engine-agnostic. The director emits
//! [`TraceEvent`]s into whatever [`TraceSink`] the host attaches; inspectors and exporters live
//! outside the scheduler.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod trace;

pub use trace::{NullTraceSink, SharedTraceLog, TraceEvent, TraceLog, TraceSink, VecTraceSink};
