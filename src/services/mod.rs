pub mod audit;
mod container_service;
mod orchestrator;
pub mod readiness;

pub use audit::AuditClient;
pub use container_service::ContainerService;
pub use orchestrator::{Orchestrator, RunningRanger};
