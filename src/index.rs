//! Task record index and reference-count table.
//!
//! The index is the authoritative local view of which records exist because
//! of which tasks. Mutation goes only through [`TaskIndex::contribute`] and
//! [`TaskIndex::retract`] (or [`TaskIndex::apply`], which dispatches to
//! them from a lifecycle transition), so the two invariants cannot be
//! broken from outside:
//!
//! - a task id is present iff its last observed state was running
//! - a record is in the refcount table iff its count is at least one, and
//!   the table's key set is exactly the deduplicated desired record set

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::records::Record;
use crate::store::RecordOp;
use crate::task::TaskId;

/// Per-task record tracker plus global refcount table.
#[derive(Debug, Default)]
pub struct TaskIndex {
    tasks: HashMap<TaskId, Vec<Record>>,
    refcounts: HashMap<Record, usize>,
}

impl TaskIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a task lifecycle transition, returning the operations needed
    /// to bring the replicated zone in line.
    ///
    /// A transition that does not change presence (running while already
    /// indexed, or not-running while absent) is a no-op, which also makes
    /// duplicate event delivery harmless.
    pub fn apply(&mut self, id: &TaskId, running: bool, records: Vec<Record>) -> Vec<RecordOp> {
        let present = self.tasks.contains_key(id);
        match (present, running) {
            (false, true) => self.contribute(id.clone(), records).into_iter().collect(),
            (true, false) => self.retract(id).into_iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Register a newly running task and its derived records.
    ///
    /// Returns the add operation to issue, or `None` when the task was
    /// already present or contributes no records. A task with no records
    /// is still indexed: presence tracks lifecycle state, not record count.
    pub fn contribute(&mut self, id: TaskId, records: Vec<Record>) -> Option<RecordOp> {
        if self.tasks.contains_key(&id) {
            return None;
        }

        for record in &records {
            *self.refcounts.entry(record.clone()).or_insert(0) += 1;
        }
        debug!(task_id = %id, records = records.len(), "task contributed records");
        let op = (!records.is_empty()).then(|| RecordOp::AddAll(records.clone()));
        self.tasks.insert(id, records);
        op
    }

    /// Drop a task that stopped running.
    ///
    /// Decrements the refcount of each record it contributed and returns a
    /// remove operation for exactly those records whose count reached zero.
    /// Records still held by another running task stay put.
    pub fn retract(&mut self, id: &TaskId) -> Option<RecordOp> {
        let records = self.tasks.remove(id)?;

        let mut orphaned = Vec::new();
        for record in records {
            match self.refcounts.get_mut(&record) {
                Some(count) if *count > 1 => *count -= 1,
                Some(_) => {
                    self.refcounts.remove(&record);
                    orphaned.push(record);
                }
                None => {}
            }
        }
        debug!(task_id = %id, removed = orphaned.len(), "task retracted records");
        (!orphaned.is_empty()).then(|| RecordOp::RemoveAll(orphaned))
    }

    /// True if the task is currently indexed as running.
    pub fn contains(&self, id: &TaskId) -> bool {
        self.tasks.contains_key(id)
    }

    /// The deduplicated desired record set: every record at least one
    /// running task contributes.
    pub fn desired(&self) -> HashSet<Record> {
        self.refcounts.keys().cloned().collect()
    }

    /// Number of indexed (running) tasks.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Number of distinct records currently desired.
    pub fn record_count(&self) -> usize {
        self.refcounts.len()
    }
}
