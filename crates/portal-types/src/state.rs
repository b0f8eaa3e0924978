//! In-memory identity state.
//!
//! `IdentityState` is what the store publishes to every subscriber. It is a
//! plain value: the store owns the only mutable copy and hands out clones.

use serde::{Deserialize, Serialize};

use crate::station::StationId;

/// Snapshot of the station identity.
///
/// Invariants kept by the store:
/// - `last_updated.is_some()` iff `id.is_some()`
/// - `error.is_some()` implies `!is_loading` once an attempt settles
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityState {
    pub id: Option<StationId>,
    pub is_loading: bool,
    pub error: Option<String>,
    /// When `id` was last set (Unix millis). Memory only, never persisted.
    pub last_updated: Option<u64>,
}

/// Coarse lifecycle position derived from an [`IdentityState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// No id and nothing in flight. May carry an error from the last attempt.
    Idle,
    Initializing,
    Ready,
}

impl IdentityState {
    pub fn phase(&self) -> Phase {
        if self.id.is_some() {
            Phase::Ready
        } else if self.is_loading {
            Phase::Initializing
        } else {
            Phase::Idle
        }
    }

    /// True when a new initialization attempt may start.
    pub fn is_idle(&self) -> bool {
        self.phase() == Phase::Idle
    }

    /// True when no attempt is in flight (Ready, or Idle after an error).
    pub fn is_settled(&self) -> bool {
        !self.is_loading
    }
}

// ============================================================================
// Tests
// ============================================================================
