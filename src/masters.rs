//! Periodic reconciliation of the master resolver list.
//!
//! Masters are not part of the task event stream; they are polled from a
//! [`MasterSource`] on a timer. The monitor keeps the last-observed address
//! list and, when a poll comes back different, diffs the derived
//! `master.<domain>` records against the previous snapshot and hands the
//! resulting operations to the batcher.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::diff::diff_ops;
use crate::records::{master_records, Record};
use crate::store::RecordOp;

/// Source of the current master resolver address list.
#[async_trait]
pub trait MasterSource: Send + Sync {
    /// The current master addresses, in source order.
    async fn masters(&self) -> Vec<IpAddr>;
}

#[async_trait]
impl<M: MasterSource + ?Sized> MasterSource for Arc<M> {
    async fn masters(&self) -> Vec<IpAddr> {
        (**self).masters().await
    }
}

/// A fixed master list, for configuration-driven deployments.
#[derive(Debug, Clone)]
pub struct StaticMasters(
    /// The configured master addresses.
    pub Vec<IpAddr>,
);

#[async_trait]
impl MasterSource for StaticMasters {
    async fn masters(&self) -> Vec<IpAddr> {
        self.0.clone()
    }
}

/// Tracks the last-observed master list and produces record deltas.
#[derive(Debug)]
pub struct MastersMonitor {
    domain: String,
    ttl: u32,
    snapshot: Vec<IpAddr>,
}

impl MastersMonitor {
    /// Create a monitor with an empty snapshot.
    pub fn new(domain: impl Into<String>, ttl: u32) -> Self {
        Self {
            domain: domain.into(),
            ttl,
            snapshot: Vec::new(),
        }
    }

    /// Set the snapshot without producing operations. Used once after the
    /// initial full reconciliation, which already pushed these masters.
    pub fn prime(&mut self, masters: Vec<IpAddr>) {
        self.snapshot = masters;
    }

    /// The last-observed master list.
    pub fn snapshot(&self) -> &[IpAddr] {
        &self.snapshot
    }

    /// Records the current snapshot contributes to a full zone.
    pub fn records(&self) -> Vec<Record> {
        master_records(&self.snapshot, &self.domain, self.ttl)
    }

    /// Observe a freshly polled master list.
    ///
    /// Lists are compared structurally; an unchanged list produces no
    /// operations. On change, the new record set is diffed against the one
    /// derived from the previous snapshot and the snapshot is replaced.
    pub fn observe(&mut self, current: Vec<IpAddr>) -> Vec<RecordOp> {
        if current == self.snapshot {
            return Vec::new();
        }

        let previous: HashSet<Record> = self.records().into_iter().collect();
        let desired: HashSet<Record> =
            master_records(&current, &self.domain, self.ttl).into_iter().collect();

        let ops = diff_ops(&desired, &previous);
        if !ops.is_empty() {
            info!(
                masters = current.len(),
                was = self.snapshot.len(),
                "master list changed"
            );
        }
        self.snapshot = current;
        ops
    }
}
