use crate::error::RangerError;
use regex::Regex;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(60);

/// Predicate deciding when a container moves from "starting" to "ready"
#[derive(Debug, Clone)]
pub enum WaitCondition {
    /// Ready as soon as the container is started
    Nothing,
    /// At least `times` log lines match `pattern`
    LogMessage {
        pattern: Regex,
        times: usize,
        timeout: Duration,
    },
    /// The host port mapped to `port` accepts TCP connections
    ListeningPort { port: u16, timeout: Duration },
    /// Every inner condition holds, each within its own timeout
    All(Vec<WaitCondition>),
}

impl WaitCondition {
    pub fn log_message(pattern: &str, times: usize) -> Result<Self, RangerError> {
        let regex = Regex::new(pattern).map_err(|source| RangerError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        Ok(Self::LogMessage {
            pattern: regex,
            times: times.max(1),
            timeout: DEFAULT_STARTUP_TIMEOUT,
        })
    }

    pub fn listening_port(port: u16) -> Self {
        Self::ListeningPort {
            port,
            timeout: DEFAULT_STARTUP_TIMEOUT,
        }
    }

    pub fn all(conditions: impl IntoIterator<Item = WaitCondition>) -> Self {
        Self::All(conditions.into_iter().collect())
    }

    /// Sets the timeout of a single condition. Composite conditions only carry
    /// the timeouts of their members and are returned unchanged.
    pub fn with_startup_timeout(self, timeout: Duration) -> Self {
        match self {
            Self::LogMessage { pattern, times, .. } => Self::LogMessage {
                pattern,
                times,
                timeout,
            },
            Self::ListeningPort { port, .. } => Self::ListeningPort { port, timeout },
            other => other,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self {
            Self::LogMessage { timeout, .. } | Self::ListeningPort { timeout, .. } => {
                Some(*timeout)
            }
            Self::Nothing | Self::All(_) => None,
        }
    }
}

impl fmt::Display for WaitCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nothing => write!(f, "nothing"),
            Self::LogMessage { pattern, times, .. } => {
                write!(f, "log matching `{}` {} time(s)", pattern.as_str(), times)
            }
            Self::ListeningPort { port, .. } => write!(f, "port {port} listening"),
            Self::All(conditions) => {
                let parts: Vec<String> = conditions.iter().map(|c| c.to_string()).collect();
                write!(f, "all of [{}]", parts.join(", "))
            }
        }
    }
}
