//! Metrics instrumentation for zonesync.
//!
//! All metrics are prefixed with `zonesync.`

use metrics::{counter, gauge, histogram};
use std::time::Instant;

/// Task lifecycle transitions as seen by the index.
#[derive(Debug, Clone, Copy)]
pub enum TaskTransition {
    /// Task entered the running set.
    Started,
    /// Task left the running set.
    Stopped,
    /// Event did not change presence (duplicate or uninteresting state).
    Unchanged,
}

/// Record a task event by the transition it caused.
pub fn record_task_event(transition: TaskTransition) {
    let transition_str = match transition {
        TaskTransition::Started => "started",
        TaskTransition::Stopped => "stopped",
        TaskTransition::Unchanged => "unchanged",
    };

    counter!("zonesync.task.event.count", "transition" => transition_str).increment(1);
}

/// Subscription attempt outcomes.
#[derive(Debug, Clone, Copy)]
pub enum SubscribeOutcome {
    /// Subscription established.
    Connected,
    /// Transient failure, will retry.
    Retried,
    /// Fatal failure, engine terminates.
    Fatal,
}

/// Record a subscription attempt.
pub fn record_subscribe_attempt(outcome: SubscribeOutcome) {
    let outcome_str = match outcome {
        SubscribeOutcome::Connected => "connected",
        SubscribeOutcome::Retried => "retried",
        SubscribeOutcome::Fatal => "fatal",
    };

    counter!("zonesync.subscribe.attempt.count", "outcome" => outcome_str).increment(1);
}

/// Where a store push originated.
#[derive(Debug, Clone, Copy)]
pub enum PushOrigin {
    /// First submission while idle, issued immediately.
    Immediate,
    /// Coalesced buffer issued on debounce expiry.
    Flush,
    /// Full reconciliation at startup.
    Reconcile,
}

impl PushOrigin {
    /// Label value for this origin.
    pub fn as_str(self) -> &'static str {
        match self {
            PushOrigin::Immediate => "immediate",
            PushOrigin::Flush => "flush",
            PushOrigin::Reconcile => "reconcile",
        }
    }
}

/// Record a store push with its add/remove record counts.
pub fn record_push(origin: PushOrigin, adds: usize, removes: usize, duration: std::time::Duration) {
    counter!("zonesync.store.push.count", "origin" => origin.as_str()).increment(1);
    counter!("zonesync.records.added.count").increment(adds as u64);
    counter!("zonesync.records.removed.count").increment(removes as u64);
    histogram!("zonesync.store.push.duration.seconds", "origin" => origin.as_str())
        .record(duration.as_secs_f64());
    histogram!("zonesync.store.push.records").record((adds + removes) as f64);
}

/// Record a submission coalesced into the debounce buffer.
pub fn record_batch_buffered() {
    counter!("zonesync.batch.buffered.count").increment(1);
}

/// Record the add/remove totals of a full reconciliation.
pub fn record_reconcile(adds: usize, removes: usize) {
    counter!("zonesync.reconcile.count").increment(1);
    histogram!("zonesync.reconcile.adds").record(adds as f64);
    histogram!("zonesync.reconcile.removes").record(removes as f64);
}

/// Record current state gauges.
pub fn record_state_counts(tasks: usize, records: usize, masters: usize) {
    gauge!("zonesync.state.tasks.count").set(tasks as f64);
    gauge!("zonesync.state.records.count").set(records as f64);
    gauge!("zonesync.state.masters.count").set(masters as f64);
}

/// Helper for timing operations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration since timer start.
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}
