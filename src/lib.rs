//! zonesync - keeps a DNS zone synchronized with cluster scheduler state.
//!
//! This crate derives DNS resource records from the tasks a cluster
//! scheduler is running and replicates the zone into a convergent,
//! eventually-consistent distributed store shared by every node serving
//! DNS answers. It is the synchronization engine only: DNS query
//! answering, the store's merge algorithm and process supervision live
//! elsewhere.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                            zonesync                            │
//! │                                                                │
//! │  ┌──────────────┐   ┌─────────────┐   ┌──────────────────┐    │
//! │  │ Task event   │──▶│ Record      │──▶│ Task index +     │    │
//! │  │ subscription │   │ deriver     │   │ refcount table   │    │
//! │  └──────────────┘   └─────────────┘   └────────┬─────────┘    │
//! │                                                │ add/remove    │
//! │  ┌──────────────┐   ┌─────────────┐   ┌────────▼─────────┐    │
//! │  │ Masters poll │──▶│ Zone diff   │──▶│ Debounced op     │───────▶ replicated
//! │  │ timer        │   │ engine      │   │ batcher          │    │    store
//! │  └──────────────┘   └─────────────┘   └──────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every stage runs inside one actor with a single ordered input stream
//! (task events, masters ticks, debounce expiries, shutdown), so no state
//! is ever shared across threads.
//!
//! ## Naming
//!
//! Task records live under `<task>.<framework>.<scheme>.<domain>` for the
//! `agentip`, `containerip` and `autoip` schemes; masters answer at
//! `master.<domain>` and the local node at `leader.<domain>`. Every full
//! zone also carries its apex SOA and NS records.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use tokio_util::sync::CancellationToken;
//! use zonesync::{Config, MemoryStore, StaticMasters, ZoneSync};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_file("zonesync.toml").unwrap();
//!     zonesync::telemetry::init(&config.telemetry).unwrap();
//!
//!     let store = MemoryStore::new();
//!     let masters = StaticMasters(config.zone.masters.clone());
//!     let engine = ZoneSync::new(config.zone, store, masters);
//!
//!     let cancel = CancellationToken::new();
//!     let source = my_scheduler_client();
//!     engine.run(source, cancel).await.unwrap();
//! }
//! ```

#![warn(missing_docs)]

pub mod batch;
pub mod config;
pub mod diff;
pub mod error;
pub mod index;
pub mod masters;
pub mod metrics;
pub mod records;
pub mod source;
pub mod store;
pub mod sync;
pub mod task;
pub mod telemetry;

// Re-export main types
pub use config::{Config, SoaConfig, TelemetryConfig, ZoneConfig};
pub use error::SyncError;
pub use masters::{MasterSource, StaticMasters};
pub use records::{RData, Record, RecordKind};
pub use source::{Disconnect, SubscribeError, TaskSource, TaskSubscription};
pub use store::{MemoryStore, RecordOp, RecordStore, StoreError};
pub use sync::ZoneSync;
pub use task::{PortMapping, Task, TaskId, TaskState};
