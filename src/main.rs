use anyhow::Result;
use clap::{Parser, Subcommand};
use rangerbox::cli::{AuditOptions, UpOptions, audit, properties, up};
use rangerbox::infra::config::resolve_app_config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "rangerbox",
    version,
    about = "Stack descartável de Apache Ranger (admin + PostgreSQL + Solr) para testes"
)]
struct Cli {
    /// Arquivo de configuração (padrão: ./rangerbox.toml, se existir)
    #[arg(long, env = "RANGERBOX_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sobe a stack, mostra os endpoints e aguarda Enter para encerrar
    Up(UpOptions),
    /// Mostra o install.properties que será montado no admin
    Properties,
    /// Consulta o total de entradas de auditoria de um Ranger em execução
    AuditCount(AuditOptions),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = resolve_app_config(cli.config.as_deref(), &std::env::current_dir()?)?;

    match cli.command {
        Commands::Up(options) => up::run(options, &config),
        Commands::Properties => properties::run(&config),
        Commands::AuditCount(options) => audit::run(options, &config),
    }
}
