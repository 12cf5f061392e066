//! Debounced batching of replicated-set operations.
//!
//! The batcher bounds the write rate to the store: under an event burst a
//! zone sees at most one immediate push plus one coalesced push per
//! debounce window. It is a pure state machine; the engine owns the actual
//! timer and feeds expiries back in as messages.
//!
//! Two states. Idle: nothing armed, empty buffer. Pending: a timer is
//! armed and submissions buffer instead of dispatching. Each arming gets a
//! fresh generation number, and an expiry carrying a stale generation is
//! ignored, so a notification from a superseded timer cannot drain the
//! buffer early.

use std::time::Duration;

use crate::store::RecordOp;

/// What a submission produced.
#[derive(Debug, PartialEq, Eq)]
pub enum Submit {
    /// Dispatch these operations now and arm the debounce timer for the
    /// returned generation.
    Dispatch {
        /// Operations to issue immediately.
        ops: Vec<RecordOp>,
        /// Generation the caller's timer must report back.
        generation: u64,
    },
    /// Operations were buffered behind an armed timer.
    Buffered,
    /// Nothing to do; submission was empty.
    Empty,
}

/// Debounce state machine for store operations.
#[derive(Debug)]
pub struct OpBatcher {
    window: Duration,
    buffer: Vec<RecordOp>,
    armed: bool,
    generation: u64,
}

impl OpBatcher {
    /// Create an idle batcher with the given debounce window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            buffer: Vec::new(),
            armed: false,
            generation: 0,
        }
    }

    /// The debounce window the caller should sleep before reporting expiry.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// True when no timer is armed and the buffer is empty.
    pub fn is_idle(&self) -> bool {
        !self.armed && self.buffer.is_empty()
    }

    /// Submit operations.
    ///
    /// While idle, non-empty submissions dispatch immediately and arm the
    /// timer. While pending, they coalesce into the buffer. Operations
    /// carrying no records are discarded either way.
    pub fn submit(&mut self, mut ops: Vec<RecordOp>) -> Submit {
        ops.retain(|op| !op.is_empty());
        if ops.is_empty() {
            return Submit::Empty;
        }

        if self.armed {
            self.buffer.extend(ops);
            return Submit::Buffered;
        }

        self.armed = true;
        self.generation += 1;
        Submit::Dispatch {
            ops,
            generation: self.generation,
        }
    }

    /// Report a timer expiry for the given generation.
    ///
    /// A current-generation expiry disarms the timer, drains the buffer and
    /// returns it when non-empty. Stale generations return `None` and leave
    /// the state untouched.
    pub fn expire(&mut self, generation: u64) -> Option<Vec<RecordOp>> {
        if !self.armed || generation != self.generation {
            return None;
        }

        self.armed = false;
        let drained = std::mem::take(&mut self.buffer);
        (!drained.is_empty()).then_some(drained)
    }
}
