use crate::domain::{ContainerRuntime, WaitCondition};
use crate::error::RangerError;
use anyhow::{Context, Result};
use regex::Regex;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::mpsc::RecvTimeoutError;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const PORT_POLL_INTERVAL: Duration = Duration::from_millis(250);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Blocks until `condition` holds for `container`.
///
/// Members of a composite condition are checked in order, each against its
/// own timeout; there is no overall deadline.
pub fn wait_until_ready(
    runtime: &dyn ContainerRuntime,
    container: &str,
    condition: &WaitCondition,
) -> Result<()> {
    match condition {
        WaitCondition::Nothing => Ok(()),
        WaitCondition::LogMessage {
            pattern,
            times,
            timeout,
        } => wait_for_log(runtime, container, condition, pattern, *times, *timeout),
        WaitCondition::ListeningPort { port, timeout } => {
            wait_for_port(runtime, container, condition, *port, *timeout)
        }
        WaitCondition::All(conditions) => {
            for inner in conditions {
                wait_until_ready(runtime, container, inner)?;
            }
            Ok(())
        }
    }
}

fn wait_for_log(
    runtime: &dyn ContainerRuntime,
    container: &str,
    condition: &WaitCondition,
    pattern: &Regex,
    times: usize,
    timeout: Duration,
) -> Result<()> {
    debug!("Aguardando {container}: {condition}");

    let lines = runtime
        .follow_logs(container)
        .with_context(|| format!("seguindo logs de {container}"))?;

    let deadline = Instant::now() + timeout;
    let mut matched = 0;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(startup_timeout(container, condition, timeout).into());
        }

        match lines.recv_timeout(remaining) {
            Ok(line) => {
                if pattern.is_match(&line) {
                    matched += 1;
                    if matched >= times {
                        info!(" {container} pronto ({condition})");
                        return Ok(());
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                return Err(startup_timeout(container, condition, timeout).into());
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(RangerError::LogStreamClosed {
                    container: container.to_string(),
                    condition: condition.to_string(),
                }
                .into());
            }
        }
    }
}

fn wait_for_port(
    runtime: &dyn ContainerRuntime,
    container: &str,
    condition: &WaitCondition,
    port: u16,
    timeout: Duration,
) -> Result<()> {
    let host = runtime.host(container)?;
    let mapped = runtime
        .mapped_port(container, port)
        .with_context(|| format!("obtendo porta mapeada {port} de {container}"))?;

    debug!("Aguardando {container}: {host}:{mapped} aceitar conexões");

    let deadline = Instant::now() + timeout;
    loop {
        if is_listening(&host, mapped) {
            info!(" {container} pronto ({condition})");
            return Ok(());
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(startup_timeout(container, condition, timeout).into());
        }
        thread::sleep(PORT_POLL_INTERVAL.min(remaining));
    }
}

fn is_listening(host: &str, port: u16) -> bool {
    let Ok(addrs) = (host, port).to_socket_addrs() else {
        return false;
    };

    addrs
        .into_iter()
        .any(|addr| TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT).is_ok())
}

fn startup_timeout(container: &str, condition: &WaitCondition, timeout: Duration) -> RangerError {
    RangerError::StartupTimeout {
        container: container.to_string(),
        condition: condition.to_string(),
        timeout,
    }
}
