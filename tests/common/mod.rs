//! Shared test infrastructure for sync engine integration tests.

use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use zonesync::config::SoaConfig;
use zonesync::error::SyncError;
use zonesync::masters::MasterSource;
use zonesync::records::Record;
use zonesync::source::{Disconnect, SubscribeError, TaskSource, TaskSubscription};
use zonesync::store::{MemoryStore, RecordOp, RecordStore, StoreError};
use zonesync::sync::ZoneSync;
use zonesync::task::{PortMapping, Task, TaskId, TaskState};
use zonesync::ZoneConfig;

// --- Constants ---

pub const DOMAIN: &str = "cluster.test";
pub const LEADER_ADDR: &str = "10.0.0.100";

// --- Config builder ---

pub fn test_zone_config() -> ZoneConfig {
    ZoneConfig {
        domain: DOMAIN.to_string(),
        advertise_addr: LEADER_ADDR.parse().unwrap(),
        ttl: 60,
        masters: vec![],
        masters_interval_ms: 5000,
        debounce_ms: 1000,
        retry_delay_ms: 100,
        soa: SoaConfig::default(),
    }
}

// --- Task builder ---

pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            task: Task {
                id: TaskId(id.to_string()),
                name: name.to_string(),
                framework: "marathon".to_string(),
                state: TaskState::Running,
                agent_ip: None,
                container_ips: vec![],
                port_mappings: vec![],
            },
        }
    }

    pub fn agent(mut self, ip: &str) -> Self {
        self.task.agent_ip = Some(ip.parse().unwrap());
        self
    }

    pub fn container(mut self, ip: &str) -> Self {
        self.task.container_ips.push(ip.parse().unwrap());
        self
    }

    pub fn host_port(mut self, container_port: u16, host_port: u16) -> Self {
        self.task.port_mappings.push(PortMapping {
            container_port,
            host_port: Some(host_port),
        });
        self
    }

    pub fn stopped(mut self) -> Self {
        self.task.state = TaskState::Other;
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}

/// A running task with an agent address, the common case.
pub fn running_task(id: &str, name: &str, agent_ip: &str) -> Task {
    TaskBuilder::new(id, name).agent(agent_ip).build()
}

// --- Record helpers ---

pub fn a_record(name: &str, addr: &str) -> Record {
    Record::address(name, 60, addr.parse().unwrap())
}

pub fn assert_records(actual: Vec<Record>, expected: &[Record]) {
    let mut actual = actual;
    actual.sort();
    let mut expected: Vec<Record> = expected.to_vec();
    expected.sort();
    assert_eq!(
        actual, expected,
        "zone records mismatch.\nactual:   {actual:#?}\nexpected: {expected:#?}"
    );
}

// --- Scripted event source ---

/// Event source driven by the test: scripted subscribe outcomes, then a
/// snapshot plus a hand-fed event stream.
pub struct ScriptedSource {
    failures: Mutex<VecDeque<SubscribeError>>,
    always_fail: bool,
    snapshot: Mutex<Vec<Task>>,
    sender: Mutex<Option<mpsc::UnboundedSender<Result<Task, Disconnect>>>>,
    attempts: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(snapshot: Vec<Task>) -> Arc<Self> {
        Self::with_failures(snapshot, vec![])
    }

    pub fn with_failures(snapshot: Vec<Task>, failures: Vec<SubscribeError>) -> Arc<Self> {
        Arc::new(Self {
            failures: Mutex::new(failures.into()),
            always_fail: false,
            snapshot: Mutex::new(snapshot),
            sender: Mutex::new(None),
            attempts: AtomicUsize::new(0),
        })
    }

    /// A source whose subscribe never succeeds with a transient error.
    pub fn failing_forever() -> Arc<Self> {
        Arc::new(Self {
            failures: Mutex::new(VecDeque::new()),
            always_fail: true,
            snapshot: Mutex::new(vec![]),
            sender: Mutex::new(None),
            attempts: AtomicUsize::new(0),
        })
    }

    /// Number of subscribe calls seen so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Deliver a task event. Panics if no subscription is live.
    pub fn send(&self, task: Task) {
        self.sender
            .lock()
            .as_ref()
            .expect("no live subscription")
            .send(Ok(task))
            .expect("event stream closed");
    }

    /// Deliver the terminal disconnect signal.
    pub fn disconnect(&self, reason: &str) {
        self.sender
            .lock()
            .as_ref()
            .expect("no live subscription")
            .send(Err(Disconnect::new(reason)))
            .expect("event stream closed");
    }

    /// End the event stream without a disconnect message.
    pub fn end_stream(&self) {
        *self.sender.lock() = None;
    }
}

#[async_trait]
impl TaskSource for ScriptedSource {
    async fn subscribe(&self) -> Result<TaskSubscription, SubscribeError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if self.always_fail {
            return Err(SubscribeError::Other("scripted failure".to_string()));
        }
        if let Some(err) = self.failures.lock().pop_front() {
            return Err(err);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *self.sender.lock() = Some(tx);
        let events = Box::pin(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        }));

        Ok(TaskSubscription {
            tasks: self.snapshot.lock().clone(),
            events,
        })
    }
}

// --- Store doubles ---

/// Memory store that counts apply calls, for write-amplification asserts.
#[derive(Clone, Default)]
pub struct CountingStore {
    inner: MemoryStore,
    pushes: Arc<AtomicUsize>,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pushes(&self) -> usize {
        self.pushes.load(Ordering::SeqCst)
    }

    pub fn records(&self, zone: &str) -> Vec<Record> {
        self.inner.records(zone)
    }

    pub fn seed(&self, zone: &str, records: impl IntoIterator<Item = Record>) {
        self.inner.seed(zone, records);
    }
}

#[async_trait]
impl RecordStore for CountingStore {
    async fn read(&self, zone: &str) -> Result<Vec<Record>, StoreError> {
        self.inner.read(zone).await
    }

    async fn apply(&self, zone: &str, ops: Vec<RecordOp>) -> Result<(), StoreError> {
        self.pushes.fetch_add(1, Ordering::SeqCst);
        self.inner.apply(zone, ops).await
    }
}

/// Store whose writes always fail.
#[derive(Clone, Default)]
pub struct FailingStore;

#[async_trait]
impl RecordStore for FailingStore {
    async fn read(&self, _zone: &str) -> Result<Vec<Record>, StoreError> {
        Ok(vec![])
    }

    async fn apply(&self, _zone: &str, _ops: Vec<RecordOp>) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("scripted outage".to_string()))
    }
}

// --- Mutable master source ---

/// Master list the test can swap out between polls.
#[derive(Clone, Default)]
pub struct SharedMasters(Arc<Mutex<Vec<IpAddr>>>);

impl SharedMasters {
    pub fn new(addrs: &[&str]) -> Self {
        let shared = Self::default();
        shared.set(addrs);
        shared
    }

    pub fn set(&self, addrs: &[&str]) {
        *self.0.lock() = addrs.iter().map(|a| a.parse().unwrap()).collect();
    }
}

#[async_trait]
impl MasterSource for SharedMasters {
    async fn masters(&self) -> Vec<IpAddr> {
        self.0.lock().clone()
    }
}

// --- Engine harness ---

pub fn spawn_engine<S, M>(
    config: ZoneConfig,
    store: S,
    masters: M,
    source: Arc<ScriptedSource>,
) -> (CancellationToken, JoinHandle<Result<(), SyncError>>)
where
    S: RecordStore + 'static,
    M: MasterSource + 'static,
{
    let cancel = CancellationToken::new();
    let engine = ZoneSync::new(config, store, masters);
    let handle = tokio::spawn(engine.run(source, cancel.clone()));
    (cancel, handle)
}

/// Let spawned tasks run without advancing the paused clock.
pub async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}
