//! The station identifier.
//!
//! A `StationId` is an opaque token minted by the backend and attached to
//! every API call. The only structural rule is `[A-Za-z0-9_-]{8,}` over the
//! whole string. The type can only be built through [`StationId::parse`], so
//! anything holding one has already passed the check; stored or received
//! values that fail it are treated as absent by callers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Minimum identifier length.
pub const MIN_STATION_ID_LEN: usize = 8;

/// A format-valid station identifier.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StationId(String);

/// Why a candidate string is not a station identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StationIdError {
    #[error("station id is empty")]
    Empty,
    #[error("station id too short: {len} chars (minimum {min})", min = MIN_STATION_ID_LEN)]
    TooShort { len: usize },
    #[error("station id contains invalid character {ch:?} at byte {index}")]
    InvalidChar { ch: char, index: usize },
}

/// Check a candidate against `[A-Za-z0-9_-]{8,}` without allocating.
pub fn is_format_valid(s: &str) -> bool {
    check(s).is_ok()
}

fn check(s: &str) -> Result<(), StationIdError> {
    if s.is_empty() {
        return Err(StationIdError::Empty);
    }
    if let Some((index, ch)) = s
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(StationIdError::InvalidChar { ch, index });
    }
    // All chars are ASCII past this point, so byte length == char count.
    if s.len() < MIN_STATION_ID_LEN {
        return Err(StationIdError::TooShort { len: s.len() });
    }
    Ok(())
}

impl StationId {
    /// Validate and wrap a candidate identifier.
    pub fn parse(s: impl Into<String>) -> Result<Self, StationIdError> {
        let s = s.into();
        check(&s)?;
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 8 characters, for logs and human display only.
    pub fn short(&self) -> &str {
        &self.0[..MIN_STATION_ID_LEN]
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<String> for StationId {
    type Error = StationIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl std::str::FromStr for StationId {
    type Err = StationIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<StationId> for String {
    fn from(id: StationId) -> String {
        id.0
    }
}

impl AsRef<str> for StationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StationId({})", self.short())
    }
}

// ============================================================================
// Tests
// ============================================================================
