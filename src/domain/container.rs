use super::image::ImageName;
use super::wait::WaitCondition;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerState {
    Running,
    Stopped,
    NotCreated,
}

#[derive(Debug, Clone)]
pub struct Container {
    pub name: String,
    pub state: ContainerState,
}

impl Container {
    pub fn new(name: String, state: ContainerState) -> Self {
        Self { name, state }
    }

    pub fn is_running(&self) -> bool {
        self.state == ContainerState::Running
    }
}

/// Content placed into a container before it starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopySource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyFile {
    pub source: CopySource,
    pub target: String,
}

/// Everything the runtime needs to create and start one container.
///
/// `name` is unique per stack and doubles as the hostname other containers on
/// the same network use to reach it.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub name: String,
    pub image: ImageName,
    pub exposed_ports: Vec<u16>,
    pub env: Vec<(String, String)>,
    pub copies: Vec<CopyFile>,
    pub command: Vec<String>,
    pub network: Option<String>,
    pub wait: WaitCondition,
}

impl ContainerSpec {
    pub fn new(name: impl Into<String>, image: ImageName) -> Self {
        Self {
            name: name.into(),
            image,
            exposed_ports: Vec::new(),
            env: Vec::new(),
            copies: Vec::new(),
            command: Vec::new(),
            network: None,
            wait: WaitCondition::Nothing,
        }
    }

    pub fn with_exposed_port(mut self, port: u16) -> Self {
        self.add_exposed_port(port);
        self
    }

    pub fn add_exposed_port(&mut self, port: u16) {
        if !self.exposed_ports.contains(&port) {
            self.exposed_ports.push(port);
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_env(key, value);
        self
    }

    /// Sets a variable, replacing an earlier value for the same key in place
    pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.env.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.env.push((key, value)),
        }
    }

    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn with_copy(mut self, source: CopySource, target: impl Into<String>) -> Self {
        self.set_copy(source, target);
        self
    }

    /// Registers a file copy; a later copy to the same target wins
    pub fn set_copy(&mut self, source: CopySource, target: impl Into<String>) {
        let target = target.into();
        self.copies.retain(|c| c.target != target);
        self.copies.push(CopyFile { source, target });
    }

    pub fn with_command<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    pub fn with_wait(mut self, wait: WaitCondition) -> Self {
        self.wait = wait;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_is_replaced_in_place() {
        let spec = ContainerSpec::new("pg", ImageName::parse("postgres:15"))
            .with_env("A", "1")
            .with_env("B", "2")
            .with_env("A", "3");

        assert_eq!(
            spec.env,
            vec![("A".to_string(), "3".to_string()), ("B".to_string(), "2".to_string())]
        );
        assert_eq!(spec.env_var("A"), Some("3"));
        assert_eq!(spec.env_var("C"), None);
    }

    #[test]
    fn exposed_ports_are_deduplicated() {
        let spec = ContainerSpec::new("solr", ImageName::parse("solr"))
            .with_exposed_port(8983)
            .with_exposed_port(8983);
        assert_eq!(spec.exposed_ports, vec![8983]);
    }

    #[test]
    fn later_copy_to_same_target_wins() {
        let spec = ContainerSpec::new("admin", ImageName::parse("apache/ranger"))
            .with_copy(CopySource::Bytes(b"a".to_vec()), "/opt/file")
            .with_copy(CopySource::Path(PathBuf::from("/tmp/b")), "/opt/file");

        assert_eq!(spec.copies.len(), 1);
        assert_eq!(spec.copies[0].source, CopySource::Path(PathBuf::from("/tmp/b")));
    }
}
