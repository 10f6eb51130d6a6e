use crate::domain::CopySource;
use crate::infra;
use crate::infra::config::{AdminConfig, AppConfig};
use anyhow::{Context, Result, bail};
use clap::Args;
use std::io;
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub struct UpOptions {
    /// Aguarda também a criação deste serviço no Ranger (ex.: trino)
    #[arg(long)]
    pub wait_for_service: Option<String>,

    /// Copia um arquivo para o container admin, no formato ORIGEM:DESTINO
    #[arg(long = "copy", value_name = "ORIGEM:DESTINO", value_parser = parse_copy)]
    pub copies: Vec<(PathBuf, String)>,
}

pub fn parse_copy(value: &str) -> Result<(PathBuf, String)> {
    let Some((source, target)) = value.rsplit_once(':') else {
        bail!("esperado ORIGEM:DESTINO, recebido '{value}'");
    };
    if source.is_empty() || !target.starts_with('/') {
        bail!("esperado ORIGEM:DESTINO com destino absoluto, recebido '{value}'");
    }
    Ok((PathBuf::from(source), target.to_string()))
}

pub fn run(options: UpOptions, config: &AppConfig) -> Result<()> {
    let mut config = config.clone();
    config.merge(AppConfig {
        admin: AdminConfig {
            wait_for_service: options.wait_for_service,
            ..Default::default()
        },
        ..Default::default()
    });

    let mut ranger = config.to_container()?;
    for (source, target) in options.copies {
        if !source.is_file() {
            bail!("Arquivo {:?} não encontrado", source);
        }
        ranger = ranger.with_copy_to_container(CopySource::Path(source), target);
    }

    let credentials = config.credentials();
    let mut running = infra::orchestrator().start(ranger)?;

    println!("🚀 Ranger admin:  {}", running.ranger_url()?);
    println!("📚 Ranger audit:  {}", running.audit_store_url()?);
    println!(
        "🐘 Ranger db:     {}:{}",
        running.host()?,
        running.default_ranger_db_port()?
    );
    println!(
        "🔑 Credenciais:   {} / {}",
        credentials.username, credentials.password
    );
    println!("Pressione Enter para encerrar...");

    let mut line = String::new();
    io::stdin().read_line(&mut line).context("lendo stdin")?;

    running.stop()?;
    println!("✅ Tudo parado");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_copy_argument() {
        let (source, target) =
            parse_copy("scripts/create.py:/home/ranger/scripts/create.py").unwrap();
        assert_eq!(source, PathBuf::from("scripts/create.py"));
        assert_eq!(target, "/home/ranger/scripts/create.py");
    }

    #[test]
    fn rejects_relative_target() {
        assert!(parse_copy("a.py:relative").is_err());
        assert!(parse_copy("no-separator").is_err());
        assert!(parse_copy(":/abs").is_err());
    }
}
