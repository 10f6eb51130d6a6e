use crate::domain::{Container, ContainerRuntime, ContainerSpec, ContainerState};
use anyhow::{Result, bail};
use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, RwLock};

#[derive(Debug, Clone)]
pub struct MockContainer {
    pub name: String,
    pub state: ContainerState,
    pub spec: Option<ContainerSpec>,
}

#[derive(Debug, Default)]
struct MockLogs {
    lines: HashMap<String, Vec<String>>,
    held_open: Vec<String>,
    subscribers: Vec<(String, Sender<String>)>,
}

/// In-memory `ContainerRuntime` recording every call as `operation:name`
#[derive(Debug)]
pub struct MockRuntime {
    containers: RwLock<HashMap<String, MockContainer>>,
    commands: RwLock<Vec<String>>,
    fail_on: RwLock<Option<String>>,
    ports: RwLock<HashMap<(String, u16), u16>>,
    logs: Mutex<MockLogs>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self {
            containers: RwLock::new(HashMap::new()),
            commands: RwLock::new(Vec::new()),
            fail_on: RwLock::new(None),
            ports: RwLock::new(HashMap::new()),
            logs: Mutex::new(MockLogs::default()),
        }
    }

    pub fn add_container(&self, name: &str, state: ContainerState) {
        self.containers.write().unwrap().insert(
            name.to_string(),
            MockContainer {
                name: name.to_string(),
                state,
                spec: None,
            },
        );
    }

    /// Fails the next calls of `operation` (e.g. `start`), or of one
    /// container only (e.g. `start:ranger-admin-1234`)
    pub fn set_fail_on(&self, operation: &str) {
        *self.fail_on.write().unwrap() = Some(operation.to_string());
    }

    pub fn clear_fail_on(&self) {
        *self.fail_on.write().unwrap() = None;
    }

    pub fn get_commands(&self) -> Vec<String> {
        self.commands.read().unwrap().clone()
    }

    pub fn container_exists(&self, name: &str) -> bool {
        self.containers.read().unwrap().contains_key(name)
    }

    pub fn get_state(&self, name: &str) -> Option<ContainerState> {
        self.containers
            .read()
            .unwrap()
            .get(name)
            .map(|c| c.state.clone())
    }

    pub fn get_spec(&self, name: &str) -> Option<ContainerSpec> {
        self.containers
            .read()
            .unwrap()
            .get(name)
            .and_then(|c| c.spec.clone())
    }

    pub fn map_port(&self, name: &str, container_port: u16, host_port: u16) {
        self.ports
            .write()
            .unwrap()
            .insert((name.to_string(), container_port), host_port);
    }

    /// Canned log lines replayed to every follower of `name`
    pub fn add_logs(&self, name: &str, lines: &[&str]) {
        let mut logs = self.logs.lock().unwrap();
        logs.lines
            .entry(name.to_string())
            .or_default()
            .extend(lines.iter().map(|l| l.to_string()));
    }

    /// Keeps log streams of `name` connected after the canned lines, like a
    /// container that is still running
    pub fn hold_logs_open(&self, name: &str) {
        self.logs.lock().unwrap().held_open.push(name.to_string());
    }

    /// Appends a line and delivers it to current followers
    pub fn push_log(&self, name: &str, line: &str) {
        let mut logs = self.logs.lock().unwrap();
        logs.lines
            .entry(name.to_string())
            .or_default()
            .push(line.to_string());
        logs.subscribers
            .retain(|(target, tx)| target != name || tx.send(line.to_string()).is_ok());
    }

    fn record_command(&self, cmd: &str) {
        self.commands.write().unwrap().push(cmd.to_string());
    }

    fn check_fail(&self, operation: &str, name: &str) -> Result<()> {
        if let Some(ref fail_on) = *self.fail_on.read().unwrap() {
            if fail_on == operation || *fail_on == format!("{operation}:{name}") {
                bail!("Mock failure on: {}:{}", operation, name);
            }
        }
        Ok(())
    }
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerRuntime for MockRuntime {
    fn get_container(&self, name: &str) -> Result<Container> {
        self.record_command(&format!("get_container:{}", name));
        self.check_fail("get_container", name)?;

        let state = self
            .containers
            .read()
            .unwrap()
            .get(name)
            .map(|c| c.state.clone())
            .unwrap_or(ContainerState::NotCreated);

        Ok(Container::new(name.to_string(), state))
    }

    fn start_container(&self, spec: &ContainerSpec) -> Result<()> {
        self.record_command(&format!("start:{}", spec.name));
        self.check_fail("start", &spec.name)?;

        self.containers.write().unwrap().insert(
            spec.name.clone(),
            MockContainer {
                name: spec.name.clone(),
                state: ContainerState::Running,
                spec: Some(spec.clone()),
            },
        );
        Ok(())
    }

    fn stop_container(&self, name: &str) -> Result<()> {
        self.record_command(&format!("stop:{}", name));
        self.check_fail("stop", name)?;

        if let Some(container) = self.containers.write().unwrap().get_mut(name) {
            container.state = ContainerState::Stopped;
        }
        Ok(())
    }

    fn follow_logs(&self, name: &str) -> Result<Receiver<String>> {
        self.record_command(&format!("follow_logs:{}", name));
        self.check_fail("follow_logs", name)?;

        let (tx, rx) = mpsc::channel();
        let mut logs = self.logs.lock().unwrap();
        for line in logs.lines.get(name).into_iter().flatten() {
            let _ = tx.send(line.clone());
        }
        if logs.held_open.iter().any(|n| n == name) {
            logs.subscribers.push((name.to_string(), tx));
        }
        Ok(rx)
    }

    fn host(&self, name: &str) -> Result<String> {
        self.check_fail("host", name)?;
        Ok("127.0.0.1".to_string())
    }

    fn mapped_port(&self, name: &str, port: u16) -> Result<u16> {
        self.record_command(&format!("mapped_port:{}:{}", name, port));
        self.check_fail("mapped_port", name)?;

        match self.ports.read().unwrap().get(&(name.to_string(), port)) {
            Some(host_port) => Ok(*host_port),
            None => bail!("Porta {port} de {name} não está mapeada"),
        }
    }
}
