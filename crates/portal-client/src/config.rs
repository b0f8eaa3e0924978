//! Client configuration.
//!
//! Layered: built-in defaults, then an optional TOML file, then `PORTAL_*`
//! environment variables. The binary applies its flags on top.
//!
//! ```toml
//! api_base = "https://portal.example.org/api"
//! station_header = "X-Id-Estacion"
//! storage_key = "portal.station-id"
//! storage_path = "/var/lib/portal/station.json"   # optional
//! request_timeout_secs = 30
//! send_client_hints = true
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use reqwest::header::HeaderName;
use serde::{Deserialize, Serialize};

use crate::constants::{
    APP_DIR, CONFIG_FILE, DEFAULT_API_BASE, DEFAULT_REQUEST_TIMEOUT, DEFAULT_STATION_HEADER,
    DEFAULT_STORAGE_KEY,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value for {var}: {value:?}")]
    Env { var: &'static str, value: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub api_base: String,
    pub station_header: String,
    pub storage_key: String,
    /// Overrides the per-origin file under the data directory.
    pub storage_path: Option<PathBuf>,
    pub request_timeout_secs: u64,
    pub send_client_hints: bool,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            station_header: DEFAULT_STATION_HEADER.to_string(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            storage_path: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            send_client_hints: true,
        }
    }
}

impl PortalConfig {
    /// `$XDG_CONFIG_HOME/portal/config.toml` or the platform equivalent.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load file + environment and validate.
    ///
    /// An explicit `path` must exist. Without one, the default path is used
    /// only if present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(p) => Self::from_file(&p)?,
                None => Self::default(),
            },
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Apply `PORTAL_*` overrides from `lookup`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(v) = lookup("PORTAL_API_BASE") {
            self.api_base = v;
        }
        if let Some(v) = lookup("PORTAL_STATION_HEADER") {
            self.station_header = v;
        }
        if let Some(v) = lookup("PORTAL_STORAGE_KEY") {
            self.storage_key = v;
        }
        if let Some(v) = lookup("PORTAL_STORAGE_PATH") {
            self.storage_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("PORTAL_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = v.parse().map_err(|_| ConfigError::Env {
                var: "PORTAL_REQUEST_TIMEOUT_SECS",
                value: v,
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api_url()?;
        self.header_name()?;
        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::Invalid("storage_key cannot be empty".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be > 0".into()));
        }
        Ok(())
    }

    pub fn api_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.api_base)
            .map_err(|e| ConfigError::Invalid(format!("api_base {:?}: {e}", self.api_base)))?;
        if url.host_str().is_none() {
            return Err(ConfigError::Invalid(format!("api_base {:?} has no host", self.api_base)));
        }
        Ok(url)
    }

    pub fn header_name(&self) -> Result<HeaderName, ConfigError> {
        HeaderName::from_bytes(self.station_header.as_bytes()).map_err(|e| {
            ConfigError::Invalid(format!("station_header {:?}: {e}", self.station_header))
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Filesystem-safe name for the API origin (`scheme_host_port`).
    pub fn origin_slug(&self) -> Result<String, ConfigError> {
        let url = self.api_url()?;
        let host = url.host_str().unwrap_or_default();
        let port = url.port_or_known_default().unwrap_or(0);
        let slug = format!("{}_{}_{}", url.scheme(), host, port)
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        Ok(slug)
    }

    /// Where the persisted id lives, or `None` when no data dir exists.
    pub fn storage_file(&self) -> Result<Option<PathBuf>, ConfigError> {
        if let Some(path) = &self.storage_path {
            return Ok(Some(path.clone()));
        }
        let slug = self.origin_slug()?;
        Ok(dirs::data_local_dir().map(|d| d.join(APP_DIR).join(format!("{slug}.json"))))
    }
}

// ============================================================================
// Tests
// ============================================================================
