//! The scheduler event source contract.
//!
//! A [`TaskSource`] hands out at most one live [`TaskSubscription`]: the
//! full snapshot of current tasks plus a stream of task updates. The
//! stream is pull-based, and polling for the next item is the flow-control
//! acknowledgment: the engine processes one event, then asks for the next,
//! so delivery is strictly sequential. A stream error or end is the
//! unsolicited disconnect signal and is fatal to the engine.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::task::Task;

/// Why a subscription attempt failed.
#[derive(Debug, Clone, Error)]
pub enum SubscribeError {
    /// The event source did not answer in time. Fatal.
    #[error("subscription request timed out")]
    Timeout,
    /// A subscription already exists for this consumer. Fatal.
    #[error("already subscribed to the event source")]
    AlreadySubscribed,
    /// Anything else; retried after a short fixed delay.
    #[error("subscription failed: {0}")]
    Other(String),
}

/// Terminal disconnect signal from the event source.
#[derive(Debug, Clone, Error)]
#[error("{reason}")]
pub struct Disconnect {
    /// Reason reported by the event source.
    pub reason: String,
}

impl Disconnect {
    /// Build a disconnect signal with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Stream of task updates; ends (or errors) on disconnect.
pub type EventStream = BoxStream<'static, Result<Task, Disconnect>>;

/// A live subscription: initial snapshot plus the update stream.
pub struct TaskSubscription {
    /// Full snapshot of tasks known at subscription time.
    pub tasks: Vec<Task>,
    /// Updates after the snapshot, one task descriptor per event.
    pub events: EventStream,
}

/// A scheduler event source the engine can subscribe to.
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Request a subscription with an initial full snapshot.
    async fn subscribe(&self) -> Result<TaskSubscription, SubscribeError>;
}

#[async_trait]
impl<T: TaskSource + ?Sized> TaskSource for Arc<T> {
    async fn subscribe(&self) -> Result<TaskSubscription, SubscribeError> {
        (**self).subscribe().await
    }
}
