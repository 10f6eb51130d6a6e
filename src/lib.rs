pub mod cli;
pub mod domain;
pub mod error;
pub mod infra;
pub mod services;

// Make test_support available for integration tests
pub mod test_support;

pub use domain::{
    Container, ContainerRuntime, ContainerSpec, ContainerState, Credentials, ImageName,
    RangerContainer, WaitCondition,
};
pub use error::RangerError;
pub use infra::TestcontainersAdapter;
pub use services::{AuditClient, ContainerService, Orchestrator, RunningRanger};
