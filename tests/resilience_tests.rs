use anyhow::Result;
use rangerbox::domain::ranger::SOLR_PORT;
use rangerbox::domain::{ContainerState, RangerContainer};
use rangerbox::services::{ContainerService, Orchestrator};
use rangerbox::test_support::MockRuntime;
use rangerbox::RangerError;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::{Duration, Instant};

const PG_READY: &str = "database system is ready to accept connections";

fn create_orchestrator() -> (Orchestrator, Arc<MockRuntime>) {
    let mock = Arc::new(MockRuntime::new());
    let container_service = Arc::new(ContainerService::new(mock.clone()));
    (Orchestrator::new(container_service), mock)
}

fn healthy_dependencies(mock: &MockRuntime, ranger: &RangerContainer) -> TcpListener {
    let solr = TcpListener::bind("127.0.0.1:0").unwrap();
    mock.add_logs(&ranger.ranger_db().name, &[PG_READY, PG_READY]);
    mock.map_port(
        &ranger.audit_store().name,
        SOLR_PORT,
        solr.local_addr().unwrap().port(),
    );
    solr
}

#[test]
fn test_stress_admin_startup_timeout() {
    // An admin that never logs its startup line must fail after the
    // configured timeout instead of hanging
    let (orchestrator, mock) = create_orchestrator();
    let ranger = RangerContainer::new()
        .with_defaults()
        .with_startup_timeout(Duration::from_millis(100));
    let _solr = healthy_dependencies(&mock, &ranger);
    let admin = ranger.admin().name.clone();
    mock.hold_logs_open(&admin);
    mock.add_logs(&admin, &["Starting Apache Ranger Admin Service"]);

    let start = Instant::now();
    let err = orchestrator.start(ranger).unwrap_err();
    let elapsed = start.elapsed();

    assert!(matches!(
        err.downcast_ref::<RangerError>(),
        Some(RangerError::StartupTimeout { .. })
    ));
    assert!(
        elapsed < Duration::from_secs(5),
        "timeout should be honoured, took {elapsed:?}"
    );
    assert_eq!(mock.get_state(&admin), Some(ContainerState::Stopped));
}

#[test]
fn test_audit_store_port_never_opens() {
    let (orchestrator, mock) = create_orchestrator();
    let ranger = RangerContainer::new()
        .with_defaults()
        .with_audit_store_container_modifier(|solr| {
            solr.wait = solr.wait.clone().with_startup_timeout(Duration::from_millis(200));
        });
    let db = ranger.ranger_db().name.clone();
    let solr = ranger.audit_store().name.clone();
    let admin = ranger.admin().name.clone();

    mock.add_logs(&db, &[PG_READY, PG_READY]);
    let closed_port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    mock.map_port(&solr, SOLR_PORT, closed_port);

    let err = orchestrator.start(ranger).unwrap_err();

    assert!(format!("{err:#}").contains(&solr));
    assert!(!mock.container_exists(&admin));
    assert_eq!(mock.get_state(&db), Some(ContainerState::Stopped));
    assert_eq!(mock.get_state(&solr), Some(ContainerState::Stopped));
}

#[test]
fn test_stop_continues_after_failure() -> Result<()> {
    let (orchestrator, mock) = create_orchestrator();
    let ranger = RangerContainer::new().with_defaults();
    let _solr = healthy_dependencies(&mock, &ranger);
    let admin = ranger.admin().name.clone();
    let db = ranger.ranger_db().name.clone();
    let solr = ranger.audit_store().name.clone();
    mock.add_logs(&admin, &["Apache Ranger Admin Service with pid 9 has started."]);

    let mut running = orchestrator.start(ranger)?;
    mock.set_fail_on(&format!("stop:{db}"));

    assert!(running.stop().is_err());
    assert_eq!(mock.get_state(&admin), Some(ContainerState::Stopped));
    assert_eq!(mock.get_state(&solr), Some(ContainerState::Stopped));
    Ok(())
}

#[test]
fn test_drop_survives_stop_failure() -> Result<()> {
    let (orchestrator, mock) = create_orchestrator();
    let ranger = RangerContainer::new();
    let admin = ranger.admin().name.clone();
    mock.add_logs(&admin, &["Apache Ranger Admin Service with pid 9 has started."]);

    let running = orchestrator.start(ranger)?;
    mock.set_fail_on("stop");
    drop(running);

    assert_eq!(mock.get_state(&admin), Some(ContainerState::Running));
    mock.clear_fail_on();
    Ok(())
}

#[test]
fn test_runtime_failure_on_start_is_propagated() {
    let (orchestrator, mock) = create_orchestrator();
    let ranger = RangerContainer::new().with_defaults();
    mock.set_fail_on("start");

    let err = orchestrator.start(ranger).unwrap_err();

    assert!(format!("{err:#}").contains("Mock failure"));
    assert!(
        mock.get_commands()
            .iter()
            .all(|c| !c.starts_with("stop:")),
        "nothing was started, so nothing should be stopped"
    );
}
