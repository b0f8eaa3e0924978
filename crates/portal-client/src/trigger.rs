//! Mount-time and navigation-time initialization triggers.
//!
//! [`MountTrigger`] is what an individual component holds: on mount, and on
//! back/forward history traversal, it starts `ensure_initialized` in the
//! background if no id is present. It never blocks the caller.
//!
//! [`RootProvider`] does the same once for the whole application and then
//! keeps listening to the router's navigation events until that channel
//! closes. Children get a [`StationHandle`] immediately whether or not an id
//! exists yet.

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use portal_types::StationId;

use crate::coordinator::{IdentityError, StationHandle};

/// Client-side router navigation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Navigation {
    Push,
    Replace,
    Back,
    Forward,
}

impl Navigation {
    /// Back/forward traversal, the only kind that re-arms the trigger.
    pub fn is_history_traversal(self) -> bool {
        matches!(self, Navigation::Back | Navigation::Forward)
    }
}

/// Per-component initialization trigger.
#[derive(Clone)]
pub struct MountTrigger {
    station: StationHandle,
}

impl MountTrigger {
    pub fn new(station: StationHandle) -> Self {
        Self { station }
    }

    pub fn station(&self) -> &StationHandle {
        &self.station
    }

    /// Start initialization if the store is Idle.
    ///
    /// Returns the background task when one was started. The task is
    /// detached if the handle is dropped.
    pub fn on_mount(&self) -> Option<JoinHandle<Result<StationId, IdentityError>>> {
        if !self.station.snapshot().is_idle() {
            return None;
        }
        let station = self.station.clone();
        Some(tokio::spawn(async move { station.ensure_initialized().await }))
    }

    /// Re-arm on history traversal if the id is still missing.
    pub fn on_navigation(
        &self,
        nav: Navigation,
    ) -> Option<JoinHandle<Result<StationId, IdentityError>>> {
        if !nav.is_history_traversal() {
            return None;
        }
        tracing::trace!(?nav, "History navigation, checking station id");
        self.on_mount()
    }
}

/// Application-root provider.
pub struct RootProvider {
    trigger: MountTrigger,
}

/// Running provider. Dropping it leaves the listener running until the
/// navigation channel closes; call [`ProviderHandle::stop`] to end it early.
pub struct ProviderHandle {
    station: StationHandle,
    listener: JoinHandle<()>,
}

impl RootProvider {
    pub fn new(station: StationHandle) -> Self {
        Self {
            trigger: MountTrigger::new(station),
        }
    }

    /// Trigger once and start listening for navigation. Returns immediately.
    pub fn mount(self, mut navigation: broadcast::Receiver<Navigation>) -> ProviderHandle {
        let station = self.trigger.station().clone();
        self.trigger.on_mount();

        let trigger = self.trigger;
        let listener = tokio::spawn(async move {
            loop {
                match navigation.recv().await {
                    Ok(nav) => {
                        trigger.on_navigation(nav);
                    }
                    // Missed events may have included a traversal.
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Navigation listener lagged");
                        trigger.on_mount();
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            tracing::debug!("Navigation channel closed, root provider listener exiting");
        });

        ProviderHandle { station, listener }
    }
}

impl ProviderHandle {
    /// Render children. Runs immediately; never waits for the id.
    pub fn render<R>(&self, children: impl FnOnce(&StationHandle) -> R) -> R {
        children(&self.station)
    }

    pub fn station(&self) -> &StationHandle {
        &self.station
    }

    pub fn is_listening(&self) -> bool {
        !self.listener.is_finished()
    }

    pub fn stop(self) {
        self.listener.abort();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_traversal() {
        assert!(Navigation::Back.is_history_traversal());
        assert!(Navigation::Forward.is_history_traversal());
        assert!(!Navigation::Push.is_history_traversal());
        assert!(!Navigation::Replace.is_history_traversal());
    }
}
