use super::container::{ContainerSpec, CopySource};
use super::image::ImageName;
use super::install_properties::{
    AUDIT_COLLECTION_KEY, DB_ROOT_PASSWORD_KEY, DB_ROOT_USER_KEY, InstallProperties,
};
use super::wait::WaitCondition;
use crate::error::RangerError;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};

pub const IMAGE: &str = "apache/ranger";
pub const DEFAULT_TAG: &str = "2.5.0";
pub const CONTAINER_INSTALL_PROPERTIES_PATH: &str = "/opt/ranger/admin/install.properties";
/// Matches `policymgr_external_url` in the install properties
pub const RANGER_PORT: u16 = 6080;

pub const POSTGRES_IMAGE: &str = "postgres";
pub const POSTGRES_DEFAULT_TAG: &str = "9.6.12";
pub const POSTGRES_PORT: u16 = 5432;
pub const RANGER_DB_ALIAS: &str = "ranger-pg-db";
pub const RANGER_DB_USERNAME: &str = "postgres";
pub const RANGER_DB_PASSWORD: &str = "postgres";

pub const SOLR_IMAGE: &str = "solr";
pub const SOLR_DEFAULT_TAG: &str = "8.3.0";
pub const SOLR_PORT: u16 = 8983;
pub const AUDIT_STORE_ALIAS: &str = "ranger-solr-audit";
pub const AUDIT_COLLECTION: &str = "ranger_audits";
pub const AUDIT_CONFIGSET_PATH: &str = "/opt/solr/server/solr/configsets/ranger_audits";

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "Rangeradmin1";

const ADMIN_STARTED_PATTERN: &str = r".*Apache Ranger Admin Service with pid [0-9]+ has started.*";
const ADMIN_STARTUP_TIMEOUT: Duration = Duration::from_secs(120);
const SERVICE_CREATION_TIMEOUT: Duration = Duration::from_secs(90);
const POSTGRES_READY_PATTERN: &str = r".*database system is ready to accept connections.*";
const POSTGRES_STARTUP_TIMEOUT: Duration = Duration::from_secs(60);

static ADMIN_STARTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(ADMIN_STARTED_PATTERN).expect("valid admin pattern"));
static POSTGRES_READY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(POSTGRES_READY_PATTERN).expect("valid postgres pattern"));

/// Basic-auth credentials for the admin REST API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new(DEFAULT_ADMIN_USERNAME, DEFAULT_ADMIN_PASSWORD)
    }
}

/// Where the admin container's install properties come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallPropertiesSource {
    /// The bundled template, with hosts rewritten to the stack's own containers
    Rendered(InstallProperties),
    /// A caller-supplied file, copied verbatim
    File(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyRole {
    Database,
    AuditStore,
}

impl DependencyRole {
    pub fn port(&self) -> u16 {
        match self {
            Self::Database => POSTGRES_PORT,
            Self::AuditStore => SOLR_PORT,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Database => "banco",
            Self::AuditStore => "audit store",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Dependency {
    pub role: DependencyRole,
    pub spec: ContainerSpec,
}

/// Final, immutable set of specs handed to the orchestrator
#[derive(Debug, Clone)]
pub struct StackPlan {
    pub admin: ContainerSpec,
    pub dependencies: Vec<Dependency>,
}

impl StackPlan {
    pub fn dependency(&self, role: DependencyRole) -> Option<&Dependency> {
        self.dependencies.iter().find(|d| d.role == role)
    }
}

/// Ranger admin service description: the admin container plus the PostgreSQL
/// database and Solr audit store it depends on.
///
/// Exposed ports:
/// - Ranger: 6080
#[derive(Debug, Clone)]
pub struct RangerContainer {
    id: String,
    admin: ContainerSpec,
    database: ContainerSpec,
    audit_store: ContainerSpec,
    install_properties: InstallPropertiesSource,
    /// Explicit `with_install_property` values, applied after the host and
    /// credential rewrites
    property_overrides: Vec<(String, String)>,
    defaults_applied: bool,
}

impl RangerContainer {
    pub fn new() -> Self {
        Self::build(
            ImageName::new(IMAGE, DEFAULT_TAG),
            ImageName::new(POSTGRES_IMAGE, POSTGRES_DEFAULT_TAG),
            ImageName::new(SOLR_IMAGE, SOLR_DEFAULT_TAG),
        )
    }

    pub fn from_image(image: ImageName) -> Result<Self, RangerError> {
        Self::from_images(
            image,
            ImageName::new(POSTGRES_IMAGE, POSTGRES_DEFAULT_TAG),
            ImageName::new(SOLR_IMAGE, SOLR_DEFAULT_TAG),
        )
    }

    pub fn from_images(
        image: ImageName,
        ranger_db: ImageName,
        audit_store: ImageName,
    ) -> Result<Self, RangerError> {
        image.assert_compatible_with(&ImageName::new(IMAGE, DEFAULT_TAG))?;
        Ok(Self::build(image, ranger_db, audit_store))
    }

    fn build(image: ImageName, ranger_db: ImageName, audit_store: ImageName) -> Self {
        let id = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();

        let admin = ContainerSpec::new(format!("ranger-admin-{id}"), image)
            .with_exposed_port(RANGER_PORT)
            .with_wait(admin_started_condition());

        Self {
            database: default_ranger_db(&id, ranger_db),
            audit_store: default_audit_store(&id, audit_store),
            admin,
            install_properties: InstallPropertiesSource::Rendered(InstallProperties::template()),
            property_overrides: Vec::new(),
            defaults_applied: false,
            id,
        }
    }

    /// Puts all three containers on a fresh network, mounts the install
    /// properties, selects the PostgreSQL backend and makes the admin service
    /// depend on the database and audit store.
    pub fn with_defaults(self) -> Self {
        let network = format!("ranger-net-{}", self.id);
        let mut this = self.with_network(network).with_env("RANGER_DB_TYPE", "postgres");
        this.defaults_applied = true;
        this
    }

    pub fn with_ranger_db_container_modifier(
        mut self,
        modifier: impl FnOnce(&mut ContainerSpec),
    ) -> Self {
        modifier(&mut self.database);
        self
    }

    pub fn with_audit_store_container_modifier(
        mut self,
        modifier: impl FnOnce(&mut ContainerSpec),
    ) -> Self {
        modifier(&mut self.audit_store);
        self
    }

    /// Waits for the admin service and, additionally, for the log line
    /// announcing that `service` has been created
    pub fn with_wait_for_service_creation(mut self, service: &str) -> Result<Self, RangerError> {
        let service_created = WaitCondition::log_message(
            &format!(".*{}.*service created.*", regex::escape(service)),
            1,
        )?
        .with_startup_timeout(SERVICE_CREATION_TIMEOUT);

        self.admin.wait = WaitCondition::all([admin_started_condition(), service_created]);
        Ok(self)
    }

    pub fn with_install_properties_file(
        mut self,
        path: impl AsRef<Path>,
    ) -> Result<Self, RangerError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(RangerError::InvalidArgument(
                "arquivo de install properties não pode ser vazio".into(),
            ));
        }
        if !path.is_file() {
            return Err(RangerError::InvalidArgument(format!(
                "install properties {:?} não é um arquivo legível",
                path
            )));
        }

        self.install_properties = InstallPropertiesSource::File(path.to_path_buf());
        Ok(self)
    }

    /// Overrides one key of the rendered install properties. Explicit values
    /// win over the hosts and credentials derived from the stack.
    pub fn with_install_property(mut self, key: &str, value: impl Into<String>) -> Self {
        if let InstallPropertiesSource::File(path) = &self.install_properties {
            warn!("  Ignorando propriedade {key}: usando arquivo {:?}", path);
            return self;
        }

        let value = value.into();
        match self.property_overrides.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.property_overrides.push((key.to_string(), value)),
        }
        self
    }

    /// Copies every file of a Solr configset directory into the audit store
    /// and pre-creates the audit collection from it
    pub fn with_audit_configset(mut self, dir: impl AsRef<Path>) -> Result<Self, RangerError> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir).map_err(|e| {
            RangerError::InvalidArgument(format!("lendo configset {:?}: {e}", dir))
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| {
                RangerError::InvalidArgument(format!("lendo configset {:?}: {e}", dir))
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();
            self.audit_store.set_copy(
                CopySource::Path(path),
                format!("{AUDIT_CONFIGSET_PATH}/conf/{file_name}"),
            );
        }

        self.audit_store.command = vec![
            "solr-precreate".into(),
            AUDIT_COLLECTION.into(),
            AUDIT_CONFIGSET_PATH.into(),
        ];
        Ok(self)
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        let network = network.into();
        self.admin.network = Some(network.clone());
        self.database.network = Some(network.clone());
        self.audit_store.network = Some(network);
        self
    }

    pub fn with_copy_to_container(mut self, source: CopySource, target: impl Into<String>) -> Self {
        self.admin.set_copy(source, target);
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.admin.set_env(key, value);
        self
    }

    /// Replaces the timeout of the admin wait condition when it is a single
    /// condition; compound waits keep their individual timeouts
    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.admin.wait = self.admin.wait.with_startup_timeout(timeout);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn admin(&self) -> &ContainerSpec {
        &self.admin
    }

    pub fn ranger_db(&self) -> &ContainerSpec {
        &self.database
    }

    pub fn audit_store(&self) -> &ContainerSpec {
        &self.audit_store
    }

    pub fn install_properties(&self) -> &InstallPropertiesSource {
        &self.install_properties
    }

    /// Containers the admin service depends on; empty until `with_defaults`
    pub fn dependencies(&self) -> Vec<&ContainerSpec> {
        if self.defaults_applied {
            vec![&self.database, &self.audit_store]
        } else {
            Vec::new()
        }
    }

    /// The install properties as they would be mounted, with hosts and
    /// database credentials taken from the current dependency specs
    pub fn rendered_install_properties(&self) -> Option<String> {
        match &self.install_properties {
            InstallPropertiesSource::Rendered(props) => {
                Some(self.resolve_properties(props).render())
            }
            InstallPropertiesSource::File(_) => None,
        }
    }

    fn resolve_properties(&self, template: &InstallProperties) -> InstallProperties {
        let mut props = template.clone();
        if let Some(collection) = self.property_override(AUDIT_COLLECTION_KEY) {
            props.set(AUDIT_COLLECTION_KEY, collection);
        }

        props.point_at(
            &format!("{}:{POSTGRES_PORT}", self.database.name),
            &format!("{}:{SOLR_PORT}", self.audit_store.name),
        );
        if let Some(user) = self.database.env_var("POSTGRES_USER") {
            props.set(DB_ROOT_USER_KEY, user);
        }
        if let Some(password) = self.database.env_var("POSTGRES_PASSWORD") {
            props.set(DB_ROOT_PASSWORD_KEY, password);
        }

        for (key, value) in &self.property_overrides {
            props.set(key, value.clone());
        }
        props
    }

    fn property_override(&self, key: &str) -> Option<&str> {
        self.property_overrides
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Consumes the descriptor; the specs are immutable from here on
    pub fn into_plan(self) -> StackPlan {
        let mut admin = self.admin.clone();

        if self.defaults_applied {
            let source = match &self.install_properties {
                InstallPropertiesSource::Rendered(props) => {
                    CopySource::Bytes(self.resolve_properties(props).render().into_bytes())
                }
                InstallPropertiesSource::File(path) => CopySource::Path(path.clone()),
            };
            admin.set_copy(source, CONTAINER_INSTALL_PROPERTIES_PATH);
        }

        let dependencies = if self.defaults_applied {
            vec![
                Dependency {
                    role: DependencyRole::Database,
                    spec: self.database,
                },
                Dependency {
                    role: DependencyRole::AuditStore,
                    spec: self.audit_store,
                },
            ]
        } else {
            Vec::new()
        };

        debug!(
            "Plano da stack {}: admin {} + {} dependência(s)",
            self.id,
            admin.name,
            dependencies.len()
        );

        StackPlan {
            admin,
            dependencies,
        }
    }
}

impl Default for RangerContainer {
    fn default() -> Self {
        Self::new()
    }
}

fn admin_started_condition() -> WaitCondition {
    WaitCondition::LogMessage {
        pattern: ADMIN_STARTED.clone(),
        times: 1,
        timeout: ADMIN_STARTUP_TIMEOUT,
    }
}

fn default_ranger_db(id: &str, image: ImageName) -> ContainerSpec {
    // :5432 in the install properties
    ContainerSpec::new(format!("{RANGER_DB_ALIAS}-{id}"), image)
        .with_exposed_port(POSTGRES_PORT)
        .with_env("POSTGRES_USER", RANGER_DB_USERNAME)
        .with_env("POSTGRES_PASSWORD", RANGER_DB_PASSWORD)
        .with_env("POSTGRES_DB", "postgres")
        .with_wait(WaitCondition::LogMessage {
            pattern: POSTGRES_READY.clone(),
            times: 2,
            timeout: POSTGRES_STARTUP_TIMEOUT,
        })
}

fn default_audit_store(id: &str, image: ImageName) -> ContainerSpec {
    // :8983 in the install properties
    ContainerSpec::new(format!("{AUDIT_STORE_ALIAS}-{id}"), image)
        .with_exposed_port(SOLR_PORT)
        .with_env("SOLR_DEPLOYMENT", "standalone")
        .with_env("SOLR_SHARDS", "1")
        .with_env("SOLR_REPLICATION", "1")
        .with_env("xpack.security.enabled", "false")
        .with_env("ES_JAVA_OPTS", "-Xms500m -Xmx500m")
        .with_env("SOLR_PORT", SOLR_PORT.to_string())
        .with_env("SOLR_HEAP", "800m")
        .with_command(["solr-precreate", AUDIT_COLLECTION])
        .with_wait(WaitCondition::listening_port(SOLR_PORT))
}
