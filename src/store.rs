//! The replicated store seam and an in-memory reference implementation.
//!
//! The store is an external service shared by every node serving the zone.
//! This crate only ever talks to it through [`RecordStore`]: read the
//! current converged value of a zone, or apply a batch of add/remove
//! operations. Merge semantics (convergent, commutative, duplicate
//! tolerant) are the store's business.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

use crate::records::Record;

/// One replicated-set operation against a zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOp {
    /// Add every listed record to the zone's set.
    AddAll(Vec<Record>),
    /// Remove every listed record from the zone's set.
    RemoveAll(Vec<Record>),
}

impl RecordOp {
    /// True when the operation carries no records.
    pub fn is_empty(&self) -> bool {
        match self {
            RecordOp::AddAll(records) | RecordOp::RemoveAll(records) => records.is_empty(),
        }
    }

    /// Number of records the operation carries.
    pub fn len(&self) -> usize {
        match self {
            RecordOp::AddAll(records) | RecordOp::RemoveAll(records) => records.len(),
        }
    }
}

/// Errors surfaced by a store implementation.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// The store reached but refused the request.
    #[error("store rejected request: {0}")]
    Rejected(String),
}

/// Narrow request/response interface to the replicated store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read the current converged record set for a zone. An absent zone
    /// reads as empty.
    async fn read(&self, zone: &str) -> Result<Vec<Record>, StoreError>;

    /// Apply a batch of operations to a zone atomically.
    async fn apply(&self, zone: &str, ops: Vec<RecordOp>) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    async fn read(&self, zone: &str) -> Result<Vec<Record>, StoreError> {
        (**self).read(zone).await
    }

    async fn apply(&self, zone: &str, ops: Vec<RecordOp>) -> Result<(), StoreError> {
        (**self).apply(zone, ops).await
    }
}

/// In-memory store with add/remove-all set semantics.
///
/// Reference implementation of the store contract, used by the integration
/// suite and suitable for embedding in other test harnesses. Clones share
/// the same underlying zones.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    zones: Arc<Mutex<HashMap<String, HashSet<Record>>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current records of a zone, sorted, for assertions.
    pub fn records(&self, zone: &str) -> Vec<Record> {
        let zones = self.zones.lock();
        let mut records: Vec<Record> = zones
            .get(zone)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        records.sort();
        records
    }

    /// Seed a zone with records, bypassing the operation API.
    pub fn seed(&self, zone: &str, records: impl IntoIterator<Item = Record>) {
        let mut zones = self.zones.lock();
        zones
            .entry(zone.to_string())
            .or_default()
            .extend(records);
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn read(&self, zone: &str) -> Result<Vec<Record>, StoreError> {
        let zones = self.zones.lock();
        Ok(zones
            .get(zone)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn apply(&self, zone: &str, ops: Vec<RecordOp>) -> Result<(), StoreError> {
        let mut zones = self.zones.lock();
        let set = zones.entry(zone.to_string()).or_default();
        for op in ops {
            match op {
                RecordOp::AddAll(records) => set.extend(records),
                RecordOp::RemoveAll(records) => {
                    for record in &records {
                        set.remove(record);
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(name: &str) -> Record {
        Record::address(name, 60, "10.0.0.1".parse().unwrap())
    }

    #[tokio::test]
    async fn test_absent_zone_reads_empty() {
        let store = MemoryStore::new();
        assert!(store.read("cluster.test").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_then_remove() {
        let store = MemoryStore::new();
        store
            .apply("z", vec![RecordOp::AddAll(vec![rec("a.z"), rec("b.z")])])
            .await
            .unwrap();
        assert_eq!(store.records("z").len(), 2);

        store
            .apply("z", vec![RecordOp::RemoveAll(vec![rec("a.z")])])
            .await
            .unwrap();
        assert_eq!(store.records("z"), vec![rec("b.z")]);
    }

    #[tokio::test]
    async fn test_duplicate_adds_merge() {
        let store = MemoryStore::new();
        let ops = vec![
            RecordOp::AddAll(vec![rec("a.z")]),
            RecordOp::AddAll(vec![rec("a.z")]),
        ];
        store.apply("z", ops).await.unwrap();
        assert_eq!(store.records("z").len(), 1);
    }

    #[tokio::test]
    async fn test_removing_absent_record_is_tolerated() {
        let store = MemoryStore::new();
        store
            .apply("z", vec![RecordOp::RemoveAll(vec![rec("a.z")])])
            .await
            .unwrap();
        assert!(store.records("z").is_empty());
    }

    #[test]
    fn test_op_is_empty() {
        assert!(RecordOp::AddAll(vec![]).is_empty());
        assert!(!RecordOp::RemoveAll(vec![rec("a.z")]).is_empty());
    }
}
