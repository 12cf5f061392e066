//! Configuration types for zonesync.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use crate::error::SyncError;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Zone synchronization configuration.
    pub zone: ZoneConfig,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Load configuration from a TOML file, with `ZONESYNC__`-prefixed
    /// environment variables layered on top.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SyncError> {
        config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("ZONESYNC")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| SyncError::Config(e.to_string()))
    }
}

/// Zone synchronization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneConfig {
    /// Cluster DNS domain the zone is rooted at (e.g., "cluster.internal").
    pub domain: String,

    /// Address this node advertises; answers the `leader.<domain>` record.
    pub advertise_addr: IpAddr,

    /// TTL for derived records in seconds.
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Static master resolver addresses, for deployments without discovery.
    #[serde(default)]
    pub masters: Vec<IpAddr>,

    /// Master list poll interval in milliseconds.
    #[serde(default = "default_masters_interval_ms")]
    pub masters_interval_ms: u64,

    /// Debounce window for store writes in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Delay before retrying a transiently failed subscription, in
    /// milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// SOA record configuration.
    #[serde(default)]
    pub soa: SoaConfig,
}

impl ZoneConfig {
    /// Master poll interval as a [`Duration`].
    pub fn masters_interval(&self) -> Duration {
        Duration::from_millis(self.masters_interval_ms)
    }

    /// Debounce window as a [`Duration`].
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Subscription retry delay as a [`Duration`].
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// SOA (Start of Authority) record configuration.
///
/// The serial is fixed: the replicated zone value is convergent state, not
/// a transfer source, so there is no incrementing transfer serial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoaConfig {
    /// Primary nameserver hostname (e.g., "ns.cluster.internal").
    pub mname: String,

    /// Admin email in DNS format (e.g., "admin.cluster.internal").
    pub rname: String,

    /// Zone serial.
    #[serde(default = "default_serial")]
    pub serial: u32,

    /// Refresh interval in seconds.
    #[serde(default = "default_refresh")]
    pub refresh: u32,

    /// Retry interval in seconds.
    #[serde(default = "default_retry")]
    pub retry: u32,

    /// Expire time in seconds.
    #[serde(default = "default_expire")]
    pub expire: u32,

    /// Minimum TTL in seconds.
    #[serde(default = "default_minimum")]
    pub minimum: u32,
}

impl Default for SoaConfig {
    fn default() -> Self {
        Self {
            mname: "ns.cluster.internal".to_string(),
            rname: "admin.cluster.internal".to_string(),
            serial: default_serial(),
            refresh: default_refresh(),
            retry: default_retry(),
            expire: default_expire(),
            minimum: default_minimum(),
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level filter (e.g., "info", "zonesync=debug,warn").
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Prometheus metrics exporter address.
    #[serde(default)]
    pub prometheus_addr: Option<SocketAddr>,

    /// OpenTelemetry configuration.
    #[serde(default)]
    pub opentelemetry: Option<OpenTelemetryConfig>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            prometheus_addr: None,
            opentelemetry: None,
        }
    }
}

/// OpenTelemetry exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenTelemetryConfig {
    /// OTLP endpoint (e.g., "http://localhost:4317").
    pub endpoint: String,

    /// Service name for traces.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_ttl() -> u32 {
    60
}

fn default_masters_interval_ms() -> u64 {
    5000
}

fn default_debounce_ms() -> u64 {
    1000
}

fn default_retry_delay_ms() -> u64 {
    100
}

fn default_serial() -> u32 {
    1
}

fn default_refresh() -> u32 {
    3600
}

fn default_retry() -> u32 {
    600
}

fn default_expire() -> u32 {
    604800
}

fn default_minimum() -> u32 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "zonesync".to_string()
}
