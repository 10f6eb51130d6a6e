use crate::infra::config::AppConfig;
use crate::services::AuditClient;
use anyhow::Result;
use clap::Args;

#[derive(Args, Debug)]
pub struct AuditOptions {
    /// URL base do Ranger admin (ex.: http://localhost:6080/)
    #[arg(long, env = "RANGER_URL")]
    pub url: String,
}

pub fn run(options: AuditOptions, config: &AppConfig) -> Result<()> {
    let client = AuditClient::new(options.url, config.credentials())?;
    let count = client.count()?;
    println!("📊 Entradas de auditoria: {count}");
    Ok(())
}
