//! The identity store.
//!
//! One [`IdentityStore`] exists per application instance. It owns the only
//! mutable [`IdentityState`] and publishes every change through a
//! `tokio::sync::watch` channel, so components that rendered before the id
//! existed can wait for it instead of polling.
//!
//! The store does not validate: `set` takes a [`StationId`], which can only
//! exist once the format check has passed.

use portal_types::{IdentityState, StationId};
use tokio::sync::watch;

pub struct IdentityStore {
    tx: watch::Sender<IdentityState>,
}

impl Default for IdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(IdentityState::default());
        Self { tx }
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> IdentityState {
        self.tx.borrow().clone()
    }

    pub fn id(&self) -> Option<StationId> {
        self.tx.borrow().id.clone()
    }

    /// Receiver that observes every subsequent mutation.
    pub fn subscribe(&self) -> watch::Receiver<IdentityState> {
        self.tx.subscribe()
    }

    pub fn set(&self, id: StationId) {
        self.tx.send_modify(|s| {
            s.id = Some(id);
            s.last_updated = Some(portal_types::now_millis());
            s.error = None;
        });
    }

    pub fn set_loading(&self, loading: bool) {
        self.tx.send_modify(|s| s.is_loading = loading);
    }

    pub fn set_error(&self, error: Option<String>) {
        self.tx.send_modify(|s| s.error = error);
    }

    /// Drop the id. Leaves `is_loading` alone.
    pub fn clear(&self) {
        self.tx.send_modify(|s| {
            s.id = None;
            s.last_updated = None;
            s.error = None;
        });
    }

    /// Initializing → Ready or Idle in one publish.
    ///
    /// The outcome and `is_loading = false` land together, so no subscriber
    /// ever observes an error or a fresh id while the flag is still up.
    pub(crate) fn finish(&self, outcome: Result<StationId, String>) {
        self.tx.send_modify(|s| {
            match outcome {
                Ok(id) => {
                    s.id = Some(id);
                    s.last_updated = Some(portal_types::now_millis());
                    s.error = None;
                }
                Err(message) => s.error = Some(message),
            }
            s.is_loading = false;
        });
    }

    /// Idle → Initializing, atomically.
    ///
    /// Returns `true` only for the caller that performed the transition. The
    /// check and the flag write happen under the channel's write lock, so
    /// every other caller sees `is_loading` (or the finished id) and gets
    /// `false`.
    pub(crate) fn try_begin(&self) -> bool {
        self.tx.send_if_modified(|s| {
            if s.id.is_some() || s.is_loading {
                return false;
            }
            s.is_loading = true;
            s.error = None;
            true
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
