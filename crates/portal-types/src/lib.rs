//! Shared types for the portal station-identity subsystem.
//!
//! A leaf crate with **no internal portal dependencies**: the validated
//! station identifier and the in-memory identity state that the client crate
//! publishes to its subscribers.
//!
//! # Key Types
//!
//! |-------------------|----------------------------------------------|
//! | Type              | Purpose                                      |
//! |-------------------|----------------------------------------------|
//! | [`StationId`]     | Format-valid opaque client-instance token    |
//! | [`IdentityState`] | id + loading flag + error + last update      |
//! | [`Phase`]         | Idle / Initializing / Ready view of a state  |
//! |-------------------|----------------------------------------------|

pub mod state;
pub mod station;

pub use state::{IdentityState, Phase};
pub use station::{MIN_STATION_ID_LEN, StationId, StationIdError, is_format_valid};

/// Current time as Unix milliseconds.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
