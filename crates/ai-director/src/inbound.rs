//! Hand-off point for messages produced off the scheduling thread.
//!
//! Mailboxes are only ever touched on the thread that calls `process_frame`. Code running
//! elsewhere (network handlers, loaders, worker pools computing isolated results) sends through
//! an [`Injector`]; the director pumps the channel into mailboxes at the start of each frame.

use ai_core::Outbound;
use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("director inbound queue is closed")]
pub struct InboundClosed(pub Outbound);

/// Cloneable, thread-safe sender into the director.
#[derive(Debug, Clone)]
pub struct Injector {
    tx: Sender<Outbound>,
}

impl Injector {
    pub fn send(&self, outbound: Outbound) -> Result<(), InboundClosed> {
        self.tx.try_send(outbound).map_err(|err| match err {
            TrySendError::Full(o) | TrySendError::Disconnected(o) => InboundClosed(o),
        })
    }
}

#[derive(Debug)]
pub(crate) struct InboundQueue {
    tx: Sender<Outbound>,
    rx: Receiver<Outbound>,
}

impl InboundQueue {
    pub(crate) fn new() -> Self {
        let (tx, rx) = channel::unbounded();
        Self { tx, rx }
    }

    pub(crate) fn injector(&self) -> Injector {
        Injector {
            tx: self.tx.clone(),
        }
    }

    pub(crate) fn try_iter(&self) -> impl Iterator<Item = Outbound> + '_ {
        self.rx.try_iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.rx.len()
    }
}
