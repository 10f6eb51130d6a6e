use crate::domain::InstallPropertiesSource;
use crate::infra::config::AppConfig;
use anyhow::{Context, Result};
use std::fs;

/// Prints the install properties the admin container would receive
pub fn run(config: &AppConfig) -> Result<()> {
    let ranger = config.to_container()?;

    let content = match ranger.install_properties() {
        InstallPropertiesSource::File(path) => {
            fs::read_to_string(path).with_context(|| format!("lendo {:?}", path))?
        }
        InstallPropertiesSource::Rendered(_) => {
            ranger.rendered_install_properties().unwrap_or_default()
        }
    };

    print!("{content}");
    Ok(())
}
