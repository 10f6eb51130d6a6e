use std::time::Duration;
use thiserror::Error;

/// Failures raised by the Ranger stack itself, as opposed to failures of the
/// underlying container runtime (those travel as plain `anyhow` errors).
#[derive(Debug, Error)]
pub enum RangerError {
    #[error("argumento inválido: {0}")]
    InvalidArgument(String),

    #[error("imagem '{actual}' não é compatível com '{expected}'")]
    IncompatibleImage { expected: String, actual: String },

    #[error("padrão de espera inválido '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("container '{container}' não ficou pronto em {timeout:?}: {condition}")]
    StartupTimeout {
        container: String,
        condition: String,
        timeout: Duration,
    },

    #[error("logs de '{container}' encerrados antes de satisfazer '{condition}'")]
    LogStreamClosed { container: String, condition: String },

    #[error("stack sem dependência {0}; chame with_defaults() antes")]
    NoSuchDependency(&'static str),

    #[error("status HTTP inesperado {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("resposta malformada: {0}")]
    MalformedResponse(String),

    #[error("erro de configuração: {0}")]
    Config(String),
}
