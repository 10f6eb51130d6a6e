use anyhow::Result;
use rangerbox::domain::{
    ContainerRuntime, ContainerSpec, ContainerState, CopySource, Credentials, ImageName,
    RangerContainer,
};
use rangerbox::infra::{self, TestcontainersAdapter};
use std::path::PathBuf;
use tracing::info;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("rangerbox=debug")
        .with_test_writer()
        .try_init();
}

#[test]
#[ignore = "requires a Docker daemon"]
fn test_ranger_standalone() -> Result<()> {
    init_tracing();

    let script = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/resources/create-ranger-services.py");

    let ranger = RangerContainer::new()
        .with_defaults()
        .with_copy_to_container(
            CopySource::Path(script),
            "/home/ranger/scripts/create-ranger-services.py",
        )
        .with_wait_for_service_creation("trino")?;

    let mut running = infra::orchestrator().start(ranger)?;
    running.wait_for_default_audit_store_started()?;
    running.wait_until_container_started()?;

    info!("ranger audit: {}", running.audit_store_url()?);
    info!("ranger admin: {}", running.ranger_url()?);

    let client = running.audit_client(Credentials::default())?;
    let count = client.count()?;
    info!("audit entries: {count}");

    running.stop()?;
    assert!(!running.is_running());
    Ok(())
}

#[test]
#[ignore = "requires a Docker daemon"]
fn test_restart_reuses_container_name() -> Result<()> {
    init_tracing();

    let name = format!("rangerbox-restart-{}", std::process::id());
    let spec = ContainerSpec::new(name.as_str(), ImageName::parse("postgres:9.6.12"))
        .with_exposed_port(5432)
        .with_env("POSTGRES_PASSWORD", "postgres");
    let adapter = TestcontainersAdapter::new();

    adapter.start_container(&spec)?;
    assert_eq!(adapter.get_container(&name)?.state, ContainerState::Running);

    adapter.stop_container(&name)?;
    assert_eq!(adapter.get_container(&name)?.state, ContainerState::Stopped);

    // Same Docker name again: the stopped container must be removed first
    adapter.start_container(&spec)?;
    assert_eq!(adapter.get_container(&name)?.state, ContainerState::Running);
    Ok(())
}
