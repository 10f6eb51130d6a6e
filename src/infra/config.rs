use crate::domain::install_properties::ADMIN_PASSWORD_KEY;
use crate::domain::ranger::{
    DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_USERNAME, DEFAULT_TAG, IMAGE, POSTGRES_DEFAULT_TAG,
    POSTGRES_IMAGE, SOLR_DEFAULT_TAG, SOLR_IMAGE,
};
use crate::domain::{Credentials, ImageName, RangerContainer};
use crate::error::RangerError;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_CONFIG_NAME: &str = "rangerbox.toml";

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AdminConfig {
    pub image: Option<String>,
    pub tag: Option<String>,
    pub startup_timeout_secs: Option<u64>,
    pub wait_for_service: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    pub image: Option<String>,
    pub tag: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AuditStoreConfig {
    pub image: Option<String>,
    pub tag: Option<String>,
    pub heap: Option<String>,
    pub shards: Option<u32>,
    pub replication: Option<u32>,
    pub configset: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct InstallConfig {
    pub properties_file: Option<PathBuf>,
    /// Individual overrides applied on top of the bundled template
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CredentialsConfig {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub audit_store: AuditStoreConfig,
    #[serde(default)]
    pub install: InstallConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

macro_rules! overlay {
    ($target:expr, $other:expr, [$($field:ident),+ $(,)?]) => {
        $(
            if let Some(value) = $other.$field {
                $target.$field = Some(value);
            }
        )+
    };
}

impl AppConfig {
    /// Merges another AppConfig into self.
    /// Values from `other` overwrite values in `self` if present.
    pub fn merge(&mut self, other: AppConfig) {
        overlay!(self.admin, other.admin, [image, tag, startup_timeout_secs, wait_for_service]);
        overlay!(self.database, other.database, [image, tag, username, password]);
        overlay!(
            self.audit_store,
            other.audit_store,
            [image, tag, heap, shards, replication, configset]
        );
        overlay!(self.install, other.install, [properties_file]);
        overlay!(self.credentials, other.credentials, [username, password]);

        self.install.properties.extend(other.install.properties);

        if other.base_dir.is_some() {
            self.base_dir = other.base_dir;
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(
            self.credentials
                .username
                .as_deref()
                .unwrap_or(DEFAULT_ADMIN_USERNAME),
            self.credentials
                .password
                .as_deref()
                .unwrap_or(DEFAULT_ADMIN_PASSWORD),
        )
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn validate(&self) -> Result<(), RangerError> {
        if self.audit_store.shards == Some(0) {
            return Err(RangerError::Config("audit_store.shards deve ser >= 1".into()));
        }
        if self.audit_store.replication == Some(0) {
            return Err(RangerError::Config(
                "audit_store.replication deve ser >= 1".into(),
            ));
        }
        if let Some(heap) = &self.audit_store.heap {
            if heap.trim().is_empty() {
                return Err(RangerError::Config("audit_store.heap vazio".into()));
            }
        }
        if let Some(service) = &self.admin.wait_for_service {
            if service.trim().is_empty() {
                return Err(RangerError::Config("admin.wait_for_service vazio".into()));
            }
            // The compound wait keeps fixed per-condition timeouts
            if self.admin.startup_timeout_secs.is_some() {
                return Err(RangerError::Config(
                    "admin.startup_timeout_secs não pode ser usado com admin.wait_for_service"
                        .into(),
                ));
            }
        }
        Ok(())
    }

    /// Builds the full stack description (defaults applied) from this config
    pub fn to_container(&self) -> Result<RangerContainer> {
        self.validate()?;

        let admin_image = image_name(&self.admin.image, &self.admin.tag, IMAGE, DEFAULT_TAG);
        let db_image = image_name(
            &self.database.image,
            &self.database.tag,
            POSTGRES_IMAGE,
            POSTGRES_DEFAULT_TAG,
        );
        let solr_image = image_name(
            &self.audit_store.image,
            &self.audit_store.tag,
            SOLR_IMAGE,
            SOLR_DEFAULT_TAG,
        );
        debug!("Imagens: admin {admin_image}, banco {db_image}, audit {solr_image}");

        let mut ranger = RangerContainer::from_images(admin_image, db_image, solr_image)?;

        if let Some(path) = &self.install.properties_file {
            ranger = ranger.with_install_properties_file(self.resolve(path))?;
        }
        if let Some(password) = &self.credentials.password {
            ranger = ranger.with_install_property(ADMIN_PASSWORD_KEY, password.clone());
        }
        for (key, value) in &self.install.properties {
            ranger = ranger.with_install_property(key, value.clone());
        }

        let database = self.database.clone();
        ranger = ranger
            .with_defaults()
            .with_ranger_db_container_modifier(|db| {
                if let Some(username) = database.username {
                    db.set_env("POSTGRES_USER", username);
                }
                if let Some(password) = database.password {
                    db.set_env("POSTGRES_PASSWORD", password);
                }
            });

        let audit = self.audit_store.clone();
        ranger = ranger.with_audit_store_container_modifier(|solr| {
            if let Some(heap) = audit.heap {
                solr.set_env("SOLR_HEAP", heap);
            }
            if let Some(shards) = audit.shards {
                solr.set_env("SOLR_SHARDS", shards.to_string());
            }
            if let Some(replication) = audit.replication {
                solr.set_env("SOLR_REPLICATION", replication.to_string());
            }
        });

        if let Some(dir) = &self.audit_store.configset {
            ranger = ranger.with_audit_configset(self.resolve(dir))?;
        }

        if let Some(secs) = self.admin.startup_timeout_secs {
            ranger = ranger.with_startup_timeout(Duration::from_secs(secs));
        }
        if let Some(service) = &self.admin.wait_for_service {
            ranger = ranger.with_wait_for_service_creation(service)?;
        }

        Ok(ranger)
    }
}

fn image_name(
    image: &Option<String>,
    tag: &Option<String>,
    default_image: &str,
    default_tag: &str,
) -> ImageName {
    let base = match image {
        Some(reference) => ImageName::parse(reference),
        None => ImageName::new(default_image, default_tag),
    };
    match tag {
        Some(tag) => base.with_tag(tag.clone()),
        None => base,
    }
}

pub fn load_app_config(path: &Path) -> Result<AppConfig> {
    let content =
        fs::read_to_string(path).with_context(|| format!("lendo configuração {:?}", path))?;
    let mut config: AppConfig =
        toml::from_str(&content).with_context(|| format!("parse de {:?}", path))?;

    config.base_dir = path.parent().map(Path::to_path_buf);
    Ok(config)
}

/// Loads `path` when given; otherwise `rangerbox.toml` in `search_dir` if it
/// exists; otherwise the built-in defaults
pub fn resolve_app_config(path: Option<&Path>, search_dir: &Path) -> Result<AppConfig> {
    if let Some(path) = path {
        info!("  Carregando configuração de {:?}", path);
        return load_app_config(path);
    }

    let candidate = search_dir.join(DEFAULT_CONFIG_NAME);
    if candidate.is_file() {
        info!("  Carregando configuração de {:?}", candidate);
        return load_app_config(&candidate);
    }

    debug!("Nenhum {DEFAULT_CONFIG_NAME} encontrado; usando padrões");
    Ok(AppConfig::default())
}
