pub mod config;
pub mod testcontainers_adapter;

pub use testcontainers_adapter::TestcontainersAdapter;

use crate::services::{ContainerService, Orchestrator};
use std::sync::Arc;

/// Orchestrator driving real containers through testcontainers
pub fn orchestrator() -> Orchestrator {
    let runtime = Arc::new(TestcontainersAdapter::new());
    Orchestrator::new(Arc::new(ContainerService::new(runtime)))
}
