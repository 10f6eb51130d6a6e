use super::{Container, ContainerSpec};
use anyhow::Result;
use std::fmt::Debug;
use std::sync::mpsc::Receiver;

/// Trait for container runtime operations
pub trait ContainerRuntime: Send + Sync + Debug {
    /// Get the current state of a container
    fn get_container(&self, name: &str) -> Result<Container>;

    /// Create and start a container from a spec, keyed by `spec.name`.
    /// Readiness is not awaited here.
    fn start_container(&self, spec: &ContainerSpec) -> Result<()>;

    /// Stop a container
    fn stop_container(&self, name: &str) -> Result<()>;

    /// Stream the container's log lines, from the beginning, as they appear.
    /// The channel disconnects when the container's output ends.
    fn follow_logs(&self, name: &str) -> Result<Receiver<String>>;

    /// Host on which the container's mapped ports are reachable
    fn host(&self, name: &str) -> Result<String>;

    /// Host port mapped to an exposed container port
    fn mapped_port(&self, name: &str, port: u16) -> Result<u16>;
}
