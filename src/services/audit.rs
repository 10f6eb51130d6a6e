use crate::domain::Credentials;
use crate::error::RangerError;
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const ACCESS_AUDIT_PATH: &str = "service/xaudit/access_audit";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the admin service's access-audit REST endpoints
#[derive(Debug, Clone)]
pub struct AuditClient {
    base_url: String,
    credentials: Credentials,
    http: Client,
}

impl AuditClient {
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("criando cliente HTTP")?;

        Ok(Self {
            base_url: base_url.into(),
            credentials,
            http,
        })
    }

    pub fn count_url(&self) -> String {
        format!(
            "{}/{ACCESS_AUDIT_PATH}/count",
            self.base_url.trim_end_matches('/')
        )
    }

    /// Number of access-audit entries recorded so far
    pub fn count(&self) -> Result<u64> {
        let url = self.count_url();
        debug!("GET {url}");

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "text/plain")
            .send()
            .with_context(|| format!("consultando {url}"))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .with_context(|| format!("lendo resposta de {url}"))?;

        Ok(parse_count_response(status, &body)?)
    }
}

/// Validates the status and extracts the non-negative `value` field
pub fn parse_count_response(status: u16, body: &str) -> Result<u64, RangerError> {
    if status != 200 {
        return Err(RangerError::UnexpectedStatus {
            status,
            body: body.to_string(),
        });
    }

    let json: Value = serde_json::from_str(body)
        .map_err(|e| RangerError::MalformedResponse(format!("{e}: {body}")))?;

    let value = json
        .get("value")
        .ok_or_else(|| RangerError::MalformedResponse(format!("campo 'value' ausente: {body}")))?;

    let count = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    match count {
        Some(n) if n >= 0 => Ok(n as u64),
        _ => Err(RangerError::MalformedResponse(format!(
            "'value' não é um inteiro não negativo: {value}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_url_joins_base_and_path() {
        let client = AuditClient::new("http://localhost:6080/", Credentials::default()).unwrap();
        assert_eq!(
            client.count_url(),
            "http://localhost:6080/service/xaudit/access_audit/count"
        );

        let client = AuditClient::new("http://localhost:6080", Credentials::default()).unwrap();
        assert_eq!(
            client.count_url(),
            "http://localhost:6080/service/xaudit/access_audit/count"
        );
    }

    #[test]
    fn parses_numeric_value() {
        assert_eq!(parse_count_response(200, r#"{"value":0}"#).unwrap(), 0);
        assert_eq!(parse_count_response(200, r#"{"value":17}"#).unwrap(), 17);
    }

    #[test]
    fn parses_string_value() {
        assert_eq!(parse_count_response(200, r#"{"value":"5"}"#).unwrap(), 5);
    }

    #[test]
    fn rejects_non_200_status() {
        let err = parse_count_response(401, "Unauthorized").unwrap_err();
        assert!(matches!(err, RangerError::UnexpectedStatus { status: 401, .. }));
    }

    #[test]
    fn rejects_negative_or_missing_value() {
        assert!(matches!(
            parse_count_response(200, r#"{"value":-1}"#),
            Err(RangerError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_count_response(200, r#"{"other":1}"#),
            Err(RangerError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_count_response(200, "not json"),
            Err(RangerError::MalformedResponse(_))
        ));
    }
}
