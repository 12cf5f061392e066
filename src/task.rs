//! Workload descriptors delivered by the scheduler event source.

use std::fmt;
use std::net::IpAddr;

/// Unique identifier assigned to a task by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(
    /// The raw identifier string.
    pub String,
);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Task lifecycle state as far as zone membership is concerned.
///
/// Every scheduler state that is not `Running` is collapsed into `Other`:
/// staging, finished, failed and killed tasks all contribute no records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Task is running and should be resolvable.
    Running,
    /// Any non-running state.
    Other,
}

impl TaskState {
    /// True for `Running`.
    pub fn is_running(self) -> bool {
        matches!(self, TaskState::Running)
    }
}

/// A port mapping declared by the task's container.
///
/// `host_port` is set when the container runs behind NAT and traffic must
/// enter through the agent; in that mode the container addresses are not
/// reachable from outside the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapping {
    /// Port inside the container.
    pub container_port: u16,
    /// Port on the agent the container port is mapped to, if any.
    pub host_port: Option<u16>,
}

/// A workload descriptor: one scheduled task and its network placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Scheduler-assigned identifier.
    pub id: TaskId,
    /// Display name, used as the leading DNS label after sanitization.
    pub name: String,
    /// Name of the framework that launched the task.
    pub framework: String,
    /// Lifecycle state.
    pub state: TaskState,
    /// Address of the agent the task is placed on.
    pub agent_ip: Option<IpAddr>,
    /// Addresses assigned to the task's containers, if any.
    pub container_ips: Vec<IpAddr>,
    /// Declared port mappings.
    pub port_mappings: Vec<PortMapping>,
}

impl Task {
    /// True if any port mapping carries a host port, meaning the task is
    /// reachable only through the agent address.
    pub fn uses_host_ports(&self) -> bool {
        self.port_mappings.iter().any(|pm| pm.host_port.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_is_running() {
        assert!(TaskState::Running.is_running());
        assert!(!TaskState::Other.is_running());
    }

    #[test]
    fn test_uses_host_ports() {
        let mut task = Task {
            id: "t1".into(),
            name: "web".to_string(),
            framework: "marathon".to_string(),
            state: TaskState::Running,
            agent_ip: None,
            container_ips: vec![],
            port_mappings: vec![PortMapping {
                container_port: 80,
                host_port: None,
            }],
        };
        assert!(!task.uses_host_ports());

        task.port_mappings.push(PortMapping {
            container_port: 443,
            host_port: Some(31443),
        });
        assert!(task.uses_host_ports());
    }
}
