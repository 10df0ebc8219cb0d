#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

/// A small, allocation-friendly trace event.
///
/// This is intentionally "dumb data" so it can be recorded during a frame and later rendered by
/// tooling. `a` is conventionally the agent id and `b` an event-specific quantity (elapsed
/// microseconds, message sequence number, frames of staleness).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceEvent {
    pub frame: u64,
    pub tag: Cow<'static, str>,
    pub a: u64,
    pub b: u64,
}

impl TraceEvent {
    pub fn new(frame: u64, tag: impl Into<Cow<'static, str>>) -> Self {
        Self {
            frame,
            tag: tag.into(),
            a: 0,
            b: 0,
        }
    }

    pub fn with_a(mut self, a: u64) -> Self {
        self.a = a;
        self
    }

    pub fn with_b(mut self, b: u64) -> Self {
        self.b = b;
        self
    }
}

pub trait TraceSink {
    fn emit(&mut self, event: TraceEvent);
}

#[derive(Debug, Default)]
pub struct NullTraceSink;

impl TraceSink for NullTraceSink {
    fn emit(&mut self, _event: TraceEvent) {}
}

#[derive(Debug, Default)]
pub struct VecTraceSink {
    pub events: Vec<TraceEvent>,
}

impl TraceSink for VecTraceSink {
    fn emit(&mut self, event: TraceEvent) {
        self.events.push(event);
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceLog {
    pub events: Vec<TraceEvent>,
}

impl TraceLog {
    pub fn push(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    pub fn with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a TraceEvent> + 'a {
        self.events.iter().filter(move |e| e.tag == tag)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

/// A [`TraceLog`] that can be handed to the director as a sink while the host keeps a handle
/// to read it back. Single-threaded, like the scheduler it observes.
#[derive(Debug, Clone, Default)]
pub struct SharedTraceLog(Rc<RefCell<TraceLog>>);

impl SharedTraceLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count(&self, tag: &str) -> usize {
        self.0.borrow().with_tag(tag).count()
    }

    pub fn take(&self) -> TraceLog {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        self.0.borrow().events.clone()
    }
}

impl TraceSink for SharedTraceLog {
    fn emit(&mut self, event: TraceEvent) {
        self.0.borrow_mut().push(event);
    }
}
