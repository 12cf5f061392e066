//! Error types for zonesync.

use thiserror::Error;

use crate::store::StoreError;

/// Fatal conditions that terminate the sync engine.
///
/// None of these are recovered locally; external supervision is expected
/// to restart the engine, which rebuilds its state from a fresh snapshot
/// and the store's current value.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The subscription request to the event source timed out.
    #[error("subscription request timed out")]
    SubscribeTimeout,

    /// The event source reports an existing subscription for this consumer.
    #[error("already subscribed to the event source")]
    AlreadySubscribed,

    /// The event source disconnected after the subscription was live.
    #[error("event source disconnected: {0}")]
    Disconnected(String),

    /// A replicated store request failed.
    #[error("store request failed: {0}")]
    Store(#[from] StoreError),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}
