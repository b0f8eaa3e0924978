//! Client configuration constants.
//!
//! Centralizes hardcoded values for easier configuration and documentation.

use std::time::Duration;

/// Default API base when neither config file nor environment provides one.
pub const DEFAULT_API_BASE: &str = "http://localhost:5000/api";

/// Path of the issuance endpoint, relative to the API base.
pub const ISSUE_PATH: &str = "General/GenerarIdEstacion";

/// JSON field carrying the minted identifier in the issuance response.
pub const ISSUE_RESPONSE_FIELD: &str = "idUnico";

/// Header every API call carries the station id under.
pub const DEFAULT_STATION_HEADER: &str = "X-Id-Estacion";

/// Namespaced key for the persisted identifier. Other code shares the store,
/// so never use a bare key here.
pub const DEFAULT_STORAGE_KEY: &str = "portal.station-id";

/// Default HTTP request timeout. The issuance call itself has no separate
/// deadline; this is the only bound on how long Initializing can last.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Capacity of the navigation broadcast channel handed to the root provider.
pub const NAVIGATION_CHANNEL_CAPACITY: usize = 64;

/// Application directory name under the platform config/data dirs.
pub const APP_DIR: &str = "portal";

/// Config file name inside the config directory.
pub const CONFIG_FILE: &str = "config.toml";
