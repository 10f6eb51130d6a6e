use super::readiness;
use crate::domain::{Container, ContainerRuntime, ContainerSpec, ContainerState, WaitCondition};
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug)]
pub struct ContainerService {
    runtime: Arc<dyn ContainerRuntime>,
}

impl ContainerService {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }

    pub fn get_status(&self, name: &str) -> Result<Container> {
        self.runtime.get_container(name)
    }

    pub fn start(&self, spec: &ContainerSpec) -> Result<()> {
        let container = self.runtime.get_container(&spec.name)?;

        match container.state {
            ContainerState::Running => {
                warn!("  {} já está rodando", spec.name);
                Ok(())
            }
            ContainerState::Stopped | ContainerState::NotCreated => {
                info!(" Iniciando {} ({})...", spec.name, spec.image);
                self.runtime.start_container(spec)
            }
        }
    }

    pub fn stop(&self, name: &str) -> Result<()> {
        let container = self.runtime.get_container(name)?;

        match container.state {
            ContainerState::Running => {
                info!(" Parando {name}...");
                self.runtime.stop_container(name)
            }
            ContainerState::Stopped | ContainerState::NotCreated => {
                warn!("  {name} já está parado ou não foi criado");
                Ok(())
            }
        }
    }

    pub fn wait_until_ready(&self, name: &str, condition: &WaitCondition) -> Result<()> {
        readiness::wait_until_ready(self.runtime.as_ref(), name, condition)
    }

    pub fn host(&self, name: &str) -> Result<String> {
        self.runtime.host(name)
    }

    pub fn mapped_port(&self, name: &str, port: u16) -> Result<u16> {
        self.runtime.mapped_port(name, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ImageName;
    use crate::test_support::MockRuntime;

    fn service() -> (ContainerService, Arc<MockRuntime>) {
        let mock = Arc::new(MockRuntime::new());
        (ContainerService::new(mock.clone()), mock)
    }

    #[test]
    fn start_skips_running_container() {
        let (service, mock) = service();
        mock.add_container("pg", ContainerState::Running);

        let spec = ContainerSpec::new("pg", ImageName::parse("postgres:15"));
        service.start(&spec).unwrap();

        assert!(!mock.get_commands().contains(&"start:pg".to_string()));
    }

    #[test]
    fn start_creates_missing_container() {
        let (service, mock) = service();

        let spec = ContainerSpec::new("pg", ImageName::parse("postgres:15"));
        service.start(&spec).unwrap();

        assert_eq!(mock.get_state("pg"), Some(ContainerState::Running));
    }

    #[test]
    fn stop_ignores_missing_container() {
        let (service, mock) = service();
        service.stop("ghost").unwrap();
        assert!(!mock.get_commands().contains(&"stop:ghost".to_string()));
    }
}
