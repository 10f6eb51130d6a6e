use super::audit::AuditClient;
use crate::domain::ranger::RANGER_PORT;
use crate::domain::{ContainerSpec, Credentials, DependencyRole, RangerContainer, StackPlan};
use crate::error::RangerError;
use crate::services::ContainerService;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Starts and stops a Ranger stack: dependencies first, admin last
#[derive(Debug)]
pub struct Orchestrator {
    container_service: Arc<ContainerService>,
}

impl Orchestrator {
    pub fn new(container_service: Arc<ContainerService>) -> Self {
        Self { container_service }
    }

    /// Starts every dependency and waits until it is ready, then starts the
    /// admin service and waits on its condition. On failure the containers
    /// started so far are stopped before the error is returned.
    pub fn start(&self, ranger: RangerContainer) -> Result<RunningRanger> {
        let plan = ranger.into_plan();
        info!(" Iniciando stack Ranger ({})...", plan.admin.name);

        let mut started = Vec::new();
        if let Err(e) = self.start_plan(&plan, &mut started) {
            error!("  Falha ao iniciar stack Ranger: {:#}", e);
            started.reverse();
            if let Err(stop_err) = stop_all(&self.container_service, &started) {
                warn!("  Falha ao desfazer stack parcial: {:#}", stop_err);
            }
            return Err(e);
        }

        info!(" Stack Ranger pronta");

        Ok(RunningRanger {
            plan,
            container_service: self.container_service.clone(),
            stopped: false,
        })
    }

    /// Stops all containers in the list, continuing even if individual operations fail
    pub fn stop_all(&self, container_names: &[String]) -> Result<()> {
        stop_all(&self.container_service, container_names)
    }

    fn start_plan(&self, plan: &StackPlan, started: &mut Vec<String>) -> Result<()> {
        for dependency in &plan.dependencies {
            self.start_one(&dependency.spec, started).with_context(|| {
                format!(
                    "iniciando {} {}",
                    dependency.role.label(),
                    dependency.spec.name
                )
            })?;
        }

        self.start_one(&plan.admin, started)
            .with_context(|| format!("iniciando ranger admin {}", plan.admin.name))
    }

    fn start_one(&self, spec: &ContainerSpec, started: &mut Vec<String>) -> Result<()> {
        self.container_service.start(spec)?;
        started.push(spec.name.clone());
        self.container_service.wait_until_ready(&spec.name, &spec.wait)
    }
}

fn stop_all(container_service: &ContainerService, container_names: &[String]) -> Result<()> {
    if container_names.is_empty() {
        return Ok(());
    }

    info!(" Encerrando containers...");

    let mut first_error = None;
    for name in container_names {
        match container_service.stop(name) {
            Ok(_) => debug!("Container {} parado com sucesso", name),
            Err(e) => {
                error!("  Falha ao parar {}: {}", name, e);
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => {
            info!(" Containers encerrados");
            Ok(())
        }
    }
}

/// Handle to a started stack. Dropping it stops the stack.
#[derive(Debug)]
pub struct RunningRanger {
    plan: StackPlan,
    container_service: Arc<ContainerService>,
    stopped: bool,
}

impl RunningRanger {
    pub fn plan(&self) -> &StackPlan {
        &self.plan
    }

    pub fn admin_name(&self) -> &str {
        &self.plan.admin.name
    }

    pub fn host(&self) -> Result<String> {
        self.container_service.host(&self.plan.admin.name)
    }

    pub fn ranger_port(&self) -> Result<u16> {
        self.container_service
            .mapped_port(&self.plan.admin.name, RANGER_PORT)
    }

    pub fn default_ranger_db_port(&self) -> Result<u16> {
        self.dependency_port(DependencyRole::Database)
    }

    pub fn default_audit_store_port(&self) -> Result<u16> {
        self.dependency_port(DependencyRole::AuditStore)
    }

    /// Base URL of the admin service, with a trailing slash
    pub fn ranger_url(&self) -> Result<String> {
        Ok(format!("http://{}:{}/", self.host()?, self.ranger_port()?))
    }

    pub fn audit_store_url(&self) -> Result<String> {
        Ok(format!(
            "http://{}:{}/",
            self.host()?,
            self.default_audit_store_port()?
        ))
    }

    pub fn is_running(&self) -> bool {
        !self.stopped
            && self
                .container_service
                .get_status(&self.plan.admin.name)
                .map(|c| c.is_running())
                .unwrap_or(false)
    }

    /// Client for the admin service's audit endpoints
    pub fn audit_client(&self, credentials: Credentials) -> Result<AuditClient> {
        if !self.is_running() {
            anyhow::bail!("Container {} não está rodando", self.plan.admin.name);
        }
        AuditClient::new(self.ranger_url()?, credentials)
    }

    /// Re-checks the admin wait condition
    pub fn wait_until_container_started(&self) -> Result<()> {
        self.container_service
            .wait_until_ready(&self.plan.admin.name, &self.plan.admin.wait)
    }

    pub fn wait_for_default_audit_store_started(&self) -> Result<()> {
        let dependency = self
            .plan
            .dependency(DependencyRole::AuditStore)
            .ok_or(RangerError::NoSuchDependency(DependencyRole::AuditStore.label()))?;
        self.container_service
            .wait_until_ready(&dependency.spec.name, &dependency.spec.wait)
    }

    /// Stops the admin service, then its dependencies
    pub fn stop(&mut self) -> Result<()> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;

        let mut names = vec![self.plan.admin.name.clone()];
        names.extend(self.plan.dependencies.iter().map(|d| d.spec.name.clone()));
        stop_all(&self.container_service, &names)
    }

    fn dependency_port(&self, role: DependencyRole) -> Result<u16> {
        let dependency = self
            .plan
            .dependency(role)
            .ok_or(RangerError::NoSuchDependency(role.label()))?;
        self.container_service
            .mapped_port(&dependency.spec.name, role.port())
    }
}

impl Drop for RunningRanger {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("  Falha ao encerrar stack Ranger: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ContainerState;
    use crate::test_support::MockRuntime;

    fn create_test_orchestrator() -> (Orchestrator, Arc<MockRuntime>) {
        let mock = Arc::new(MockRuntime::new());
        let container_service = Arc::new(ContainerService::new(mock.clone()));
        (Orchestrator::new(container_service), mock)
    }

    fn ready_logs(mock: &MockRuntime, ranger: &RangerContainer) {
        mock.add_logs(
            &ranger.ranger_db().name,
            &[
                "database system is ready to accept connections",
                "database system is ready to accept connections",
            ],
        );
        mock.add_logs(
            &ranger.admin().name,
            &["Apache Ranger Admin Service with pid 42 has started."],
        );
    }

    #[test]
    fn test_stop_all_stops_all_containers() {
        let (orchestrator, mock) = create_test_orchestrator();

        mock.add_container("admin", ContainerState::Running);
        mock.add_container("pg", ContainerState::Running);

        let containers = vec!["admin".to_string(), "pg".to_string()];
        orchestrator.stop_all(&containers).unwrap();

        assert_eq!(mock.get_state("admin"), Some(ContainerState::Stopped));
        assert_eq!(mock.get_state("pg"), Some(ContainerState::Stopped));
    }

    #[test]
    fn test_stop_all_continues_on_failure() {
        let (orchestrator, mock) = create_test_orchestrator();

        mock.add_container("admin", ContainerState::Running);
        mock.add_container("pg", ContainerState::Running);
        mock.set_fail_on("stop:admin");

        let containers = vec!["admin".to_string(), "pg".to_string()];
        let result = orchestrator.stop_all(&containers);

        assert!(result.is_err());
        assert_eq!(mock.get_state("pg"), Some(ContainerState::Stopped));
    }

    #[test]
    fn test_start_without_defaults_starts_admin_only() {
        let (orchestrator, mock) = create_test_orchestrator();
        let ranger = RangerContainer::new();
        ready_logs(&mock, &ranger);
        let admin = ranger.admin().name.clone();

        let running = orchestrator.start(ranger).unwrap();

        let starts: Vec<String> = mock
            .get_commands()
            .into_iter()
            .filter(|c| c.starts_with("start:"))
            .collect();
        assert_eq!(starts, vec![format!("start:{admin}")]);

        let err = running.default_ranger_db_port().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RangerError>(),
            Some(RangerError::NoSuchDependency(_))
        ));
    }

    #[test]
    fn test_drop_stops_stack() {
        let (orchestrator, mock) = create_test_orchestrator();
        let ranger = RangerContainer::new();
        ready_logs(&mock, &ranger);
        let admin = ranger.admin().name.clone();

        let running = orchestrator.start(ranger).unwrap();
        assert!(running.is_running());
        drop(running);

        assert_eq!(mock.get_state(&admin), Some(ContainerState::Stopped));
    }

    #[test]
    fn test_audit_client_requires_running_stack() {
        let (orchestrator, mock) = create_test_orchestrator();
        let ranger = RangerContainer::new();
        ready_logs(&mock, &ranger);
        let admin = ranger.admin().name.clone();
        mock.map_port(&admin, RANGER_PORT, 49153);

        let mut running = orchestrator.start(ranger).unwrap();
        let client = running.audit_client(Credentials::default()).unwrap();
        assert_eq!(
            client.count_url(),
            "http://127.0.0.1:49153/service/xaudit/access_audit/count"
        );

        running.stop().unwrap();
        assert!(running.audit_client(Credentials::default()).is_err());
    }
}
