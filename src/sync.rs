//! The zone synchronization engine.
//!
//! One actor owns every piece of mutable state: the task index, the
//! refcount table, the masters snapshot and the operation batcher. The
//! actor consumes a single ordered input stream multiplexing task events,
//! the masters poll timer, debounce expiries and shutdown, processing one
//! item at a time, so no locking is needed anywhere in the engine.
//!
//! Lifecycle: subscribe to the event source (retrying transient failures
//! on a fixed delay), build the index from the initial snapshot, diff the
//! desired zone against the store's current value and push the delta, then
//! apply events incrementally until cancelled or a fatal error ends the
//! actor. Supervision outside this crate is expected to restart a failed
//! engine; a restart rebuilds everything from a fresh snapshot.

use std::collections::HashSet;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time::{sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::batch::{OpBatcher, Submit};
use crate::config::ZoneConfig;
use crate::diff::diff;
use crate::error::SyncError;
use crate::index::TaskIndex;
use crate::masters::{MasterSource, MastersMonitor};
use crate::metrics::{self, PushOrigin, SubscribeOutcome, TaskTransition, Timer};
use crate::records::{leader_record, static_records, task_records, Record};
use crate::source::{SubscribeError, TaskSource, TaskSubscription};
use crate::store::{RecordOp, RecordStore};
use crate::task::Task;

/// Internal mailbox messages. Timer expiries come back through the same
/// queue the actor reads, so they are ordered with everything else.
#[derive(Debug)]
enum Msg {
    /// The debounce timer armed for this generation expired.
    FlushExpired(u64),
}

type FlushTx = mpsc::UnboundedSender<Msg>;

/// Zone synchronization engine. See the module docs for lifecycle.
pub struct ZoneSync<S, M> {
    config: ZoneConfig,
    store: S,
    master_source: M,
    index: TaskIndex,
    batcher: OpBatcher,
    masters: MastersMonitor,
}

impl<S: RecordStore, M: MasterSource> ZoneSync<S, M> {
    /// Create an engine for the configured zone.
    pub fn new(config: ZoneConfig, store: S, master_source: M) -> Self {
        let batcher = OpBatcher::new(config.debounce());
        let masters = MastersMonitor::new(config.domain.clone(), config.ttl);
        Self {
            config,
            store,
            master_source,
            index: TaskIndex::new(),
            batcher,
            masters,
        }
    }

    /// Run the engine until cancellation or a fatal error.
    ///
    /// Cancellation is a clean exit and returns `Ok(())`; any buffered
    /// operations are abandoned, since the next incarnation's full
    /// reconciliation re-converges the zone.
    pub async fn run<T: TaskSource>(
        mut self,
        source: T,
        cancel: CancellationToken,
    ) -> Result<(), SyncError> {
        let TaskSubscription { tasks, mut events } = match self.subscribe(&source, &cancel).await? {
            Some(subscription) => subscription,
            None => return Ok(()),
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        self.reconcile(tasks, &tx).await?;

        let mut poll = tokio::time::interval(self.config.masters_interval());
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("zone sync shutting down");
                    return Ok(());
                }

                Some(msg) = rx.recv() => match msg {
                    Msg::FlushExpired(generation) => self.flush(generation).await?,
                },

                event = events.next() => match event {
                    Some(Ok(task)) => self.handle_event(task, &tx).await?,
                    Some(Err(disconnect)) => {
                        error!(reason = %disconnect.reason, "event source disconnected");
                        return Err(SyncError::Disconnected(disconnect.reason));
                    }
                    None => {
                        error!("event stream ended unexpectedly");
                        return Err(SyncError::Disconnected("event stream ended".to_string()));
                    }
                },

                _ = poll.tick() => self.poll_masters(&tx).await?,
            }
        }
    }

    /// Subscribe to the event source.
    ///
    /// Timeout and already-subscribed are fatal. Everything else retries
    /// after a fixed delay, without bound; the event source is local to
    /// the node, so a bounded backoff buys nothing. Returns `None` when
    /// cancelled during the retry wait.
    async fn subscribe<T: TaskSource>(
        &self,
        source: &T,
        cancel: &CancellationToken,
    ) -> Result<Option<TaskSubscription>, SyncError> {
        loop {
            if cancel.is_cancelled() {
                return Ok(None);
            }

            match source.subscribe().await {
                Ok(subscription) => {
                    info!(
                        tasks = subscription.tasks.len(),
                        "subscribed to task event source"
                    );
                    metrics::record_subscribe_attempt(SubscribeOutcome::Connected);
                    return Ok(Some(subscription));
                }
                Err(SubscribeError::Timeout) => {
                    error!("subscription request timed out");
                    metrics::record_subscribe_attempt(SubscribeOutcome::Fatal);
                    return Err(SyncError::SubscribeTimeout);
                }
                Err(SubscribeError::AlreadySubscribed) => {
                    error!("event source reports an existing subscription");
                    metrics::record_subscribe_attempt(SubscribeOutcome::Fatal);
                    return Err(SyncError::AlreadySubscribed);
                }
                Err(SubscribeError::Other(reason)) => {
                    warn!(%reason, "subscription failed, retrying");
                    metrics::record_subscribe_attempt(SubscribeOutcome::Retried);
                    tokio::select! {
                        _ = cancel.cancelled() => return Ok(None),
                        _ = sleep(self.config.retry_delay()) => {}
                    }
                }
            }
        }
    }

    /// Build the index from the initial snapshot and push the delta
    /// between the desired zone and the store's current value.
    async fn reconcile(&mut self, snapshot: Vec<Task>, tx: &FlushTx) -> Result<(), SyncError> {
        for task in &snapshot {
            let running = task.state.is_running();
            let records = if running {
                task_records(task, &self.config.domain, self.config.ttl)
            } else {
                Vec::new()
            };
            self.index.apply(&task.id, running, records);
        }

        let masters = self.master_source.masters().await;
        self.masters.prime(masters);

        let desired = self.desired_zone();
        let observed: HashSet<Record> = self
            .store
            .read(&self.config.domain)
            .await?
            .into_iter()
            .collect();

        let (to_add, to_remove) = diff(&desired, &observed);
        info!(
            tasks = self.index.task_count(),
            records = desired.len(),
            adds = to_add.len(),
            removes = to_remove.len(),
            "initial zone reconciliation"
        );
        metrics::record_reconcile(to_add.len(), to_remove.len());
        self.emit_state_counts();

        let mut ops = Vec::with_capacity(2);
        if !to_remove.is_empty() {
            ops.push(RecordOp::RemoveAll(to_remove));
        }
        if !to_add.is_empty() {
            ops.push(RecordOp::AddAll(to_add));
        }
        self.submit(ops, PushOrigin::Reconcile, tx).await
    }

    /// The full desired zone: task records, apex statics, masters, leader.
    fn desired_zone(&self) -> HashSet<Record> {
        let mut desired = self.index.desired();
        desired.extend(static_records(
            &self.config.soa,
            &self.config.domain,
            self.config.ttl,
        ));
        desired.extend(self.masters.records());
        desired.insert(leader_record(
            self.config.advertise_addr,
            &self.config.domain,
            self.config.ttl,
        ));
        desired
    }

    /// Apply one task event and submit whatever delta it produced.
    async fn handle_event(&mut self, task: Task, tx: &FlushTx) -> Result<(), SyncError> {
        let running = task.state.is_running();
        let was_indexed = self.index.contains(&task.id);
        let records = if running {
            task_records(&task, &self.config.domain, self.config.ttl)
        } else {
            Vec::new()
        };
        let ops = self.index.apply(&task.id, running, records);

        let transition = match (was_indexed, running) {
            (false, true) => TaskTransition::Started,
            (true, false) => TaskTransition::Stopped,
            _ => TaskTransition::Unchanged,
        };
        metrics::record_task_event(transition);
        debug!(task_id = %task.id, state = ?task.state, ops = ops.len(), "task event");

        self.submit(ops, PushOrigin::Immediate, tx).await
    }

    /// Poll the master list and submit any delta.
    async fn poll_masters(&mut self, tx: &FlushTx) -> Result<(), SyncError> {
        let current = self.master_source.masters().await;
        let ops = self.masters.observe(current);
        self.emit_state_counts();
        self.submit(ops, PushOrigin::Immediate, tx).await
    }

    /// Route operations through the batcher, pushing dispatched ones and
    /// arming the debounce timer for them.
    async fn submit(
        &mut self,
        ops: Vec<RecordOp>,
        origin: PushOrigin,
        tx: &FlushTx,
    ) -> Result<(), SyncError> {
        match self.batcher.submit(ops) {
            Submit::Dispatch { ops, generation } => {
                self.push(origin, ops).await?;

                let window = self.batcher.window();
                let tx = tx.clone();
                tokio::spawn(async move {
                    sleep(window).await;
                    let _ = tx.send(Msg::FlushExpired(generation));
                });
            }
            Submit::Buffered => {
                metrics::record_batch_buffered();
                debug!("operations buffered behind debounce window");
            }
            Submit::Empty => {}
        }
        Ok(())
    }

    /// Handle a debounce expiry, pushing the coalesced buffer if the
    /// generation is current and the buffer non-empty.
    async fn flush(&mut self, generation: u64) -> Result<(), SyncError> {
        if let Some(ops) = self.batcher.expire(generation) {
            self.push(PushOrigin::Flush, ops).await?;
        }
        Ok(())
    }

    /// Issue a batch to the store. Any failure is fatal: the actor stops
    /// and supervision restarts it from a clean snapshot.
    async fn push(&mut self, origin: PushOrigin, ops: Vec<RecordOp>) -> Result<(), SyncError> {
        let (mut adds, mut removes) = (0usize, 0usize);
        for op in &ops {
            match op {
                RecordOp::AddAll(records) => adds += records.len(),
                RecordOp::RemoveAll(records) => removes += records.len(),
            }
        }

        let timer = Timer::start();
        if let Err(e) = self.store.apply(&self.config.domain, ops).await {
            error!(error = %e, origin = origin.as_str(), "store push failed");
            return Err(e.into());
        }

        metrics::record_push(origin, adds, removes, timer.elapsed());
        info!(adds, removes, origin = origin.as_str(), "pushed zone operations");
        Ok(())
    }

    fn emit_state_counts(&self) {
        metrics::record_state_counts(
            self.index.task_count(),
            self.index.record_count(),
            self.masters.snapshot().len(),
        );
    }
}
