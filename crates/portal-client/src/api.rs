//! Portal API client with station-id propagation.
//!
//! Every request reads the station id from the handle at call time and
//! attaches it under the configured header. Without an id the request is
//! refused locally with [`ApiError::IdentityUnavailable`]; nothing is sent.

use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Method, RequestBuilder, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::{ConfigError, PortalConfig};
use crate::coordinator::StationHandle;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("cannot call {path}: station id is not available")]
    IdentityUnavailable { path: String },
    #[error("invalid request path {path:?}: {reason}")]
    Path { path: String, reason: String },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{path} returned HTTP {status}: {body}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },
    #[error("failed to decode {path} response: {source}")]
    Decode {
        path: String,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    header: HeaderName,
    station: StationHandle,
}

impl ApiClient {
    pub fn new(
        http: reqwest::Client,
        config: &PortalConfig,
        station: StationHandle,
    ) -> Result<Self, ApiError> {
        let mut base = config.api_url()?;
        // Url::join treats a base without a trailing slash as a file.
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        Ok(Self {
            http,
            base,
            header: config.header_name()?,
            station,
        })
    }

    pub fn station(&self) -> &StationHandle {
        &self.station
    }

    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::Path {
                path: path.to_string(),
                reason: e.to_string(),
            })
    }

    /// A request builder with the station header set.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let id = self
            .station
            .require_id()
            .map_err(|_| ApiError::IdentityUnavailable {
                path: path.to_string(),
            })?;
        let url = self.url(path)?;
        let value = HeaderValue::from_str(id.as_str()).map_err(|e| ApiError::Path {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        tracing::trace!(%method, %url, station = id.short(), "API request");
        Ok(self.http.request(method, url).header(self.header.clone(), value))
    }

    pub async fn get_text(&self, path: &str) -> Result<String, ApiError> {
        let response = self.request(Method::GET, path)?.send().await?;
        read_body(path, response).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let body = self.get_text(path).await?;
        decode(path, &body)
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.request(Method::POST, path)?.json(body).send().await?;
        let text = read_body(path, response).await?;
        decode(path, &text)
    }
}

async fn read_body(path: &str, response: reqwest::Response) -> Result<String, ApiError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ApiError::Status {
            path: path.to_string(),
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

fn decode<T: DeserializeOwned>(path: &str, body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|source| ApiError::Decode {
        path: path.to_string(),
        source,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use portal_types::StationId;

    use crate::cache::StationCache;
    use crate::issuer::{ClientHints, IssueError, StationIssuer};
    use crate::storage::MemoryStore;

    struct NeverIssuer;

    #[async_trait]
    impl StationIssuer for NeverIssuer {
        async fn issue(&self, _hints: &ClientHints) -> Result<StationId, IssueError> {
            Err(IssueError::Transport("offline".into()))
        }
    }

    fn client(base: &str) -> ApiClient {
        let cache = StationCache::new(Arc::new(MemoryStore::new()), "k");
        let station = StationHandle::new(cache, Arc::new(NeverIssuer), ClientHints::default());
        let config = PortalConfig {
            api_base: base.into(),
            ..Default::default()
        };
        ApiClient::new(reqwest::Client::new(), &config, station).unwrap()
    }

    #[test]
    fn test_url_join_keeps_base_path() {
        let api = client("http://api.local/portal/api");
        assert_eq!(
            api.url("/Pacientes/Listar").unwrap().as_str(),
            "http://api.local/portal/api/Pacientes/Listar"
        );
        assert_eq!(
            api.url("Citas?dia=1").unwrap().as_str(),
            "http://api.local/portal/api/Citas?dia=1"
        );
    }

    #[test]
    fn test_request_without_id_fails_fast() {
        let api = client("http://api.local/api");
        let err = api.request(Method::GET, "Citas").unwrap_err();
        assert!(matches!(err, ApiError::IdentityUnavailable { ref path } if path == "Citas"));
    }

    #[test]
    fn test_request_attaches_header() {
        let api = client("http://api.local/api");
        api.station().store().set(StationId::parse("abc12345").unwrap());

        let request = api.request(Method::GET, "Citas").unwrap().build().unwrap();
        assert_eq!(
            request.headers().get("x-id-estacion").unwrap().to_str().unwrap(),
            "abc12345"
        );
        assert_eq!(request.url().as_str(), "http://api.local/api/Citas");
    }
}
