use crate::domain::{Container, ContainerRuntime, ContainerSpec, ContainerState, CopySource};
use anyhow::{Context, Result, anyhow};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use testcontainers::core::IntoContainerPort;
use testcontainers::runners::SyncRunner;
use testcontainers::{ContainerRequest, CopyDataSource, GenericImage, ImageExt};
use tracing::{debug, info, warn};

type ManagedContainer = testcontainers::Container<GenericImage>;

struct Managed {
    container: ManagedContainer,
    exposed_ports: Vec<u16>,
}

/// `ContainerRuntime` backed by testcontainers. Containers are removed when
/// the adapter is dropped.
pub struct TestcontainersAdapter {
    containers: Mutex<HashMap<String, Managed>>,
    stopped: Mutex<HashSet<String>>,
}

impl TestcontainersAdapter {
    pub fn new() -> Self {
        Self {
            containers: Mutex::new(HashMap::new()),
            stopped: Mutex::new(HashSet::new()),
        }
    }

    fn containers(&self) -> Result<MutexGuard<'_, HashMap<String, Managed>>> {
        self.containers
            .lock()
            .map_err(|_| anyhow!("estado de containers corrompido"))
    }

    fn stopped(&self) -> Result<MutexGuard<'_, HashSet<String>>> {
        self.stopped
            .lock()
            .map_err(|_| anyhow!("estado de containers corrompido"))
    }

    fn with_container<T>(
        &self,
        name: &str,
        f: impl FnOnce(&ManagedContainer) -> Result<T>,
    ) -> Result<T> {
        let containers = self.containers()?;
        let managed = containers
            .get(name)
            .with_context(|| format!("container {name} não foi iniciado"))?;
        f(&managed.container)
    }
}

impl Default for TestcontainersAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TestcontainersAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .containers
            .lock()
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default();
        f.debug_struct("TestcontainersAdapter")
            .field("containers", &names)
            .finish()
    }
}

impl ContainerRuntime for TestcontainersAdapter {
    fn get_container(&self, name: &str) -> Result<Container> {
        if self.stopped()?.contains(name) {
            return Ok(Container::new(name.to_string(), ContainerState::Stopped));
        }

        let state = match self.containers()?.get(name) {
            None => ContainerState::NotCreated,
            Some(managed) => probe_state(name, managed),
        };
        Ok(Container::new(name.to_string(), state))
    }

    fn start_container(&self, spec: &ContainerSpec) -> Result<()> {
        // A stopped container still holds its Docker name
        let stale = self.containers()?.remove(&spec.name);
        if let Some(stale) = stale {
            debug!("Removendo container antigo {}", spec.name);
            if let Err(e) = stale.container.rm() {
                warn!("  Falha ao remover container antigo {}: {}", spec.name, e);
            }
        }

        let container = container_request(spec)
            .start()
            .with_context(|| format!("criando container {} ({})", spec.name, spec.image))?;

        info!(" Container {} criado ({})", spec.name, container.id());

        self.stopped()?.remove(&spec.name);
        self.containers()?.insert(
            spec.name.clone(),
            Managed {
                container,
                exposed_ports: spec.exposed_ports.clone(),
            },
        );
        Ok(())
    }

    fn stop_container(&self, name: &str) -> Result<()> {
        self.with_container(name, |container| {
            container
                .stop()
                .with_context(|| format!("parando container {name}"))
        })?;
        self.stopped()?.insert(name.to_string());
        Ok(())
    }

    fn follow_logs(&self, name: &str) -> Result<Receiver<String>> {
        self.with_container(name, |container| {
            let (tx, rx) = mpsc::channel();
            forward_lines(name, container.stdout(true), tx.clone());
            forward_lines(name, container.stderr(true), tx);
            Ok(rx)
        })
    }

    fn host(&self, name: &str) -> Result<String> {
        self.with_container(name, |container| {
            let host = container
                .get_host()
                .with_context(|| format!("obtendo host de {name}"))?;
            Ok(host.to_string())
        })
    }

    fn mapped_port(&self, name: &str, port: u16) -> Result<u16> {
        self.with_container(name, |container| {
            container
                .get_host_port_ipv4(port.tcp())
                .with_context(|| format!("obtendo porta {port} de {name}"))
        })
    }
}

/// A container that exited loses its port bindings, so a missing mapping for
/// the first exposed port means it is no longer running. Containers without
/// exposed ports are trusted to be running until stopped.
fn probe_state(name: &str, managed: &Managed) -> ContainerState {
    let Some(&port) = managed.exposed_ports.first() else {
        return ContainerState::Running;
    };

    match managed.container.ports() {
        Ok(ports) if ports.map_to_host_port_ipv4(port.tcp()).is_some() => {
            ContainerState::Running
        }
        Ok(_) => {
            debug!("Container {name} sem porta {port} mapeada; considerando parado");
            ContainerState::Stopped
        }
        Err(e) => {
            debug!("Falha ao inspecionar {name}: {e}");
            ContainerState::Stopped
        }
    }
}

fn container_request(spec: &ContainerSpec) -> ContainerRequest<GenericImage> {
    let mut image = GenericImage::new(spec.image.repository.clone(), spec.image.tag.clone());
    for port in &spec.exposed_ports {
        image = image.with_exposed_port(port.tcp());
    }

    let mut request = image.with_container_name(spec.name.clone());

    for (key, value) in &spec.env {
        request = request.with_env_var(key.clone(), value.clone());
    }

    if let Some(network) = &spec.network {
        request = request.with_network(network.clone());
    }

    if !spec.command.is_empty() {
        request = request.with_cmd(spec.command.clone());
    }

    for copy in &spec.copies {
        let source: CopyDataSource = match &copy.source {
            CopySource::Path(path) => path.clone().into(),
            CopySource::Bytes(bytes) => bytes.clone().into(),
        };
        request = request.with_copy_to(copy.target.clone(), source);
    }

    request
}

/// Forwards each log line to `tx` and to the tracing output until the stream
/// ends or the receiver goes away
fn forward_lines(name: &str, reader: Box<dyn BufRead + Send>, tx: Sender<String>) {
    let name = name.to_string();
    thread::spawn(move || {
        for line in reader.lines() {
            let Ok(line) = line else {
                break;
            };
            debug!(container = %name, "{line}");
            if tx.send(line).is_err() {
                break;
            }
        }
    });
}
