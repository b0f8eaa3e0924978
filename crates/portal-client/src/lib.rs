//! Portal client: station identity and API access.
//!
//! Every call to the portal backend carries a station id, an opaque token
//! minted once per client installation and persisted locally. This crate
//! loads or issues that id exactly once no matter how many components ask for
//! it concurrently, publishes its state to subscribers, and refuses API calls
//! while it is missing.
//!
//! Start with [`bootstrap`], mount a [`RootProvider`] with the router's
//! navigation channel, and hand the resulting [`StationHandle`] and
//! [`ApiClient`] to the rest of the application.

pub mod api;
pub mod cache;
pub mod config;
pub mod constants;
pub mod coordinator;
pub mod issuer;
pub mod storage;
pub mod store;
pub mod trigger;

use std::sync::Arc;

pub use api::{ApiClient, ApiError};
pub use cache::StationCache;
pub use config::{ConfigError, PortalConfig};
pub use coordinator::{IdentityError, StationHandle};
pub use issuer::{ClientHints, HttpIssuer, IssueError, StationIssuer};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError, UnavailableStore};
pub use store::IdentityStore;
pub use trigger::{MountTrigger, Navigation, ProviderHandle, RootProvider};

pub use portal_types::{IdentityState, Phase, StationId};

/// Everything an application needs, wired from one config.
pub struct Portal {
    pub station: StationHandle,
    pub api: ApiClient,
}

/// Build the station handle and API client for `config`.
///
/// Nothing touches the network or storage here; initialization starts when
/// a [`RootProvider`] or [`MountTrigger`] mounts.
pub fn bootstrap(config: &PortalConfig) -> Result<Portal, BootstrapError> {
    config.validate()?;

    let http = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .user_agent(concat!("portal/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let store: Arc<dyn KeyValueStore> = match config.storage_file()? {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Station id storage");
            Arc::new(FileStore::new(path))
        }
        None => {
            tracing::warn!("No local data directory; station id will not persist");
            Arc::new(UnavailableStore::new("no local data directory"))
        }
    };
    let cache = StationCache::new(store, config.storage_key.clone());

    let issuer = Arc::new(HttpIssuer::new(http.clone(), &config.api_base));
    let hints = if config.send_client_hints {
        ClientHints::detect()
    } else {
        ClientHints::default()
    };

    let station = StationHandle::new(cache, issuer, hints);
    let api = ApiClient::new(http, config, station.clone())?;
    Ok(Portal { station, api })
}

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API client error: {0}")]
    Api(#[from] ApiError),
}
