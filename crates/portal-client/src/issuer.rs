//! Remote station id issuance.
//!
//! `GET <base>/General/GenerarIdEstacion[?userAgent=&timestamp=&location=]`
//! returns `{ "idUnico": "<id>" }`. One call per [`StationIssuer::issue`]; the
//! issuer never retries. Anything short of a 2xx response carrying a
//! non-empty, format-valid `idUnico` is an [`IssueError`].

use async_trait::async_trait;
use serde::Deserialize;

use portal_types::{StationId, StationIdError};

use crate::constants::ISSUE_PATH;

/// Why issuance failed. Surfaces to the UI as the identity error message.
#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error("station id request failed: {0}")]
    Transport(String),
    #[error("station id request returned HTTP {status}")]
    Status { status: u16 },
    #[error("station id response is not valid JSON: {0}")]
    Malformed(String),
    #[error("station id response has no idUnico")]
    MissingId,
    #[error("issued station id is malformed: {0}")]
    InvalidId(#[from] StationIdError),
}

/// Optional client metadata sent as query parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClientHints {
    pub user_agent: Option<String>,
    /// Unix millis at request time.
    pub timestamp: Option<u64>,
    pub location: Option<String>,
}

impl ClientHints {
    /// Hints describing this process.
    pub fn detect() -> Self {
        let user_agent = format!(
            "portal/{} ({}; {})",
            env!("CARGO_PKG_VERSION"),
            whoami::platform(),
            std::env::consts::ARCH,
        );
        Self {
            user_agent: Some(user_agent),
            timestamp: Some(portal_types::now_millis()),
            location: Some(whoami::devicename()).filter(|s| !s.is_empty()),
        }
    }

    /// Same hints with the timestamp moved to now, if one is sent at all.
    pub fn restamped(&self) -> Self {
        Self {
            timestamp: self.timestamp.map(|_| portal_types::now_millis()),
            ..self.clone()
        }
    }

    /// Query pairs in wire order, skipping absent hints.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(ua) = &self.user_agent {
            pairs.push(("userAgent", ua.clone()));
        }
        if let Some(ts) = self.timestamp {
            pairs.push(("timestamp", ts.to_string()));
        }
        if let Some(loc) = &self.location {
            pairs.push(("location", loc.clone()));
        }
        pairs
    }
}

/// Mints fresh station identifiers.
#[async_trait]
pub trait StationIssuer: Send + Sync {
    async fn issue(&self, hints: &ClientHints) -> Result<StationId, IssueError>;
}

#[derive(Deserialize)]
struct IssueResponse {
    #[serde(rename = "idUnico", default)]
    id_unico: Option<String>,
}

/// Validate an issuance response body.
fn parse_issue_body(body: &str) -> Result<StationId, IssueError> {
    let parsed: IssueResponse =
        serde_json::from_str(body).map_err(|e| IssueError::Malformed(e.to_string()))?;
    let raw = parsed
        .id_unico
        .filter(|s| !s.is_empty())
        .ok_or(IssueError::MissingId)?;
    Ok(StationId::parse(raw)?)
}

/// [`StationIssuer`] backed by the portal HTTP API.
#[derive(Clone)]
pub struct HttpIssuer {
    http: reqwest::Client,
    url: String,
}

impl HttpIssuer {
    pub fn new(http: reqwest::Client, api_base: &str) -> Self {
        Self {
            http,
            url: format!("{}/{}", api_base.trim_end_matches('/'), ISSUE_PATH),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl StationIssuer for HttpIssuer {
    #[tracing::instrument(skip_all)]
    async fn issue(&self, hints: &ClientHints) -> Result<StationId, IssueError> {
        let mut request = self.http.get(&self.url);
        let query = hints.query_pairs();
        if !query.is_empty() {
            request = request.query(&query);
        }

        let response = request
            .send()
            .await
            .map_err(|e| IssueError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IssueError::Status {
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| IssueError::Transport(e.to_string()))?;
        let id = parse_issue_body(&body)?;
        tracing::debug!(url = %self.url, station = id.short(), "Issued station id");
        Ok(id)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ok() {
        let id = parse_issue_body(r#"{"idUnico":"abc12345"}"#).unwrap();
        assert_eq!(id.as_str(), "abc12345");
    }

    #[test]
    fn test_parse_ignores_extra_fields() {
        let id = parse_issue_body(r#"{"idUnico":"abc12345","expira":null}"#).unwrap();
        assert_eq!(id.as_str(), "abc12345");
    }

    #[test]
    fn test_parse_missing_and_empty() {
        assert!(matches!(parse_issue_body("{}"), Err(IssueError::MissingId)));
        assert!(matches!(
            parse_issue_body(r#"{"idUnico":""}"#),
            Err(IssueError::MissingId)
        ));
        assert!(matches!(
            parse_issue_body(r#"{"idUnico":null}"#),
            Err(IssueError::MissingId)
        ));
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(parse_issue_body("<html>"), Err(IssueError::Malformed(_))));
        assert!(matches!(
            parse_issue_body(r#"{"idUnico":42}"#),
            Err(IssueError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_rejects_invalid_format() {
        assert!(matches!(
            parse_issue_body(r#"{"idUnico":"no spaces!"}"#),
            Err(IssueError::InvalidId(_))
        ));
    }

    #[test]
    fn test_query_pairs_skip_absent() {
        let hints = ClientHints {
            user_agent: Some("ua".into()),
            timestamp: None,
            location: Some("desk-3".into()),
        };
        assert_eq!(
            hints.query_pairs(),
            vec![("userAgent", "ua".to_string()), ("location", "desk-3".to_string())]
        );
        assert!(ClientHints::default().query_pairs().is_empty());
    }

    #[test]
    fn test_restamped_keeps_absent_timestamp_absent() {
        assert_eq!(ClientHints::default().restamped().timestamp, None);
        let hints = ClientHints {
            timestamp: Some(1),
            ..Default::default()
        };
        assert!(hints.restamped().timestamp.unwrap() > 1);
    }

    #[test]
    fn test_url_joins_base() {
        let issuer = HttpIssuer::new(reqwest::Client::new(), "http://api.local/v1/");
        assert_eq!(issuer.url(), "http://api.local/v1/General/GenerarIdEstacion");
    }
}
