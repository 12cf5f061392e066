//! Resource record values and the deriver that builds them from tasks.
//!
//! Task records are produced under three naming schemes, all rooted at the
//! cluster domain and namespaced as `<task>.<framework>.<scheme>.<domain>`:
//!
//! - `agentip` resolves to the address of the agent the task runs on
//! - `containerip` resolves to the task's container addresses
//! - `autoip` picks whichever of the two is reachable from off the host
//!
//! Records are plain values. Two records with the same name, ttl and data
//! are the same record, which is what reference counting and replicated
//! set membership are keyed on.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use tracing::warn;

use crate::config::SoaConfig;
use crate::task::Task;

/// DNS label for the agent-address scheme.
pub const SCHEME_AGENT: &str = "agentip";
/// DNS label for the container-address scheme.
pub const SCHEME_CONTAINER: &str = "containerip";
/// DNS label for the auto scheme.
pub const SCHEME_AUTO: &str = "autoip";

/// Record kind, one per supported rdata shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordKind {
    /// IPv4 address record.
    A,
    /// IPv6 address record.
    Aaaa,
    /// Nameserver record.
    Ns,
    /// Start-of-authority record.
    Soa,
}

/// Start-of-authority timers and identity, fixed per zone.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SoaData {
    /// Primary nameserver hostname.
    pub mname: String,
    /// Admin mailbox in DNS form.
    pub rname: String,
    /// Zone serial.
    pub serial: u32,
    /// Refresh interval in seconds.
    pub refresh: u32,
    /// Retry interval in seconds.
    pub retry: u32,
    /// Expire time in seconds.
    pub expire: u32,
    /// Minimum TTL in seconds.
    pub minimum: u32,
}

/// Record data. The A/AAAA split is inferred from the address family.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RData {
    /// IPv4 address.
    A(Ipv4Addr),
    /// IPv6 address.
    Aaaa(Ipv6Addr),
    /// Nameserver hostname.
    Ns(String),
    /// Start-of-authority data.
    Soa(SoaData),
}

impl From<IpAddr> for RData {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => RData::A(v4),
            IpAddr::V6(v6) => RData::Aaaa(v6),
        }
    }
}

/// A single resource record, comparable by value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Record {
    /// Fully-qualified name, without a trailing dot.
    pub name: String,
    /// Time to live in seconds.
    pub ttl: u32,
    /// Record data.
    pub rdata: RData,
}

impl Record {
    /// Build an address record, inferring A vs AAAA from the family.
    pub fn address(name: impl Into<String>, ttl: u32, addr: IpAddr) -> Self {
        Self {
            name: name.into(),
            ttl,
            rdata: addr.into(),
        }
    }

    /// The record kind implied by the data.
    pub fn kind(&self) -> RecordKind {
        match self.rdata {
            RData::A(_) => RecordKind::A,
            RData::Aaaa(_) => RecordKind::Aaaa,
            RData::Ns(_) => RecordKind::Ns,
            RData::Soa(_) => RecordKind::Soa,
        }
    }
}

/// Sanitize a raw name into a DNS label.
///
/// Lowercases, maps separators (space, dot, underscore) to hyphens, drops
/// every other character outside `[a-z0-9-]`, and trims leading/trailing
/// hyphens. Deterministic; distinct inputs may collide, and colliding names
/// from different tasks are merged by the refcount table.
pub fn sanitize_label(raw: &str) -> String {
    let mut label = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            'a'..='z' | '0'..='9' | '-' => label.push(ch),
            'A'..='Z' => label.push(ch.to_ascii_lowercase()),
            ' ' | '.' | '_' => label.push('-'),
            _ => {}
        }
    }
    label.trim_matches('-').to_string()
}

/// Build `<task>.<framework>.<scheme>.<domain>` from sanitized components.
fn scheme_name(task: &Task, scheme: &str, domain: &str) -> String {
    format!(
        "{}.{}.{}.{}",
        sanitize_label(&task.name),
        sanitize_label(&task.framework),
        scheme,
        domain
    )
}

/// Derive the records a running task contributes to the zone.
///
/// A task with neither an agent address nor container addresses is
/// anomalous: it is logged and contributes nothing.
pub fn task_records(task: &Task, domain: &str, ttl: u32) -> Vec<Record> {
    if task.agent_ip.is_none() && task.container_ips.is_empty() {
        warn!(task_id = %task.id, task = %task.name, "task has no agent or container address");
        return Vec::new();
    }

    let mut records = Vec::new();

    if let Some(agent_ip) = task.agent_ip {
        records.push(Record::address(
            scheme_name(task, SCHEME_AGENT, domain),
            ttl,
            agent_ip,
        ));
    }

    for ip in &task.container_ips {
        records.push(Record::address(
            scheme_name(task, SCHEME_CONTAINER, domain),
            ttl,
            *ip,
        ));
    }

    // Auto scheme: behind NAT (or without container addresses) the task is
    // reachable only through its agent; otherwise the container addresses
    // are the right answer.
    let auto_name = scheme_name(task, SCHEME_AUTO, domain);
    if task.container_ips.is_empty() || task.uses_host_ports() {
        if let Some(agent_ip) = task.agent_ip {
            records.push(Record::address(auto_name, ttl, agent_ip));
        }
    } else {
        for ip in &task.container_ips {
            records.push(Record::address(auto_name.clone(), ttl, *ip));
        }
    }

    dedupe(records)
}

/// Records for the current master list, under `master.<domain>`.
pub fn master_records(masters: &[IpAddr], domain: &str, ttl: u32) -> Vec<Record> {
    let name = format!("master.{domain}");
    dedupe(
        masters
            .iter()
            .map(|addr| Record::address(name.clone(), ttl, *addr))
            .collect(),
    )
}

/// The leader record, pointing at this node's own address.
pub fn leader_record(advertise_addr: IpAddr, domain: &str, ttl: u32) -> Record {
    Record::address(format!("leader.{domain}"), ttl, advertise_addr)
}

/// The static apex records present in every full zone: SOA and NS.
pub fn static_records(soa: &SoaConfig, domain: &str, ttl: u32) -> Vec<Record> {
    vec![
        Record {
            name: domain.to_string(),
            ttl,
            rdata: RData::Soa(SoaData {
                mname: soa.mname.clone(),
                rname: soa.rname.clone(),
                serial: soa.serial,
                refresh: soa.refresh,
                retry: soa.retry,
                expire: soa.expire,
                minimum: soa.minimum,
            }),
        },
        Record {
            name: domain.to_string(),
            ttl,
            rdata: RData::Ns(soa.mname.clone()),
        },
    ]
}

/// Drop exact duplicates, keeping first occurrence order.
fn dedupe(records: Vec<Record>) -> Vec<Record> {
    let mut seen = std::collections::HashSet::with_capacity(records.len());
    records.into_iter().filter(|r| seen.insert(r.clone())).collect()
}
