//! Station id initialization and the consumer-facing handle.
//!
//! [`StationHandle`] is the `Clone + Send + Sync` way into the subsystem. It
//! wraps the store, the persistent cache, and the issuer behind one `Arc`
//! and is passed explicitly to whatever needs it; there is no global.
//!
//! ```text
//!   many callers                      one attempt at a time
//!   ┌────────────────────────┐        ┌─────────────────────────────────────┐
//!   │ ensure_initialized()   │─begin─▶│ cache.read()                        │
//!   │ ensure_initialized()   │        │   hit  → store.finish               │
//!   │ ensure_initialized()   │        │   miss → issuer.issue → cache.write │
//!   └──────────┬─────────────┘        │          → store.finish             │
//!              │ wait_for(!loading)   └─────────────────────────────────────┘
//!              ▼
//!        same StationId
//! ```
//!
//! Only the caller that wins [`IdentityStore::try_begin`] does any work.
//! The others wait on the watch channel for the attempt to settle and return
//! its outcome. The attempt runs in a supervised task that no caller owns, so
//! dropping the winning caller's future, or the attempt panicking, does not
//! leave the store stuck in Initializing.

use std::sync::Arc;

use portal_types::{IdentityState, StationId};
use tokio::sync::watch;

use crate::cache::StationCache;
use crate::issuer::{ClientHints, StationIssuer};
use crate::store::IdentityStore;

/// Errors visible to identity consumers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// No station id is present and no attempt produced one.
    #[error("station id is not available")]
    Unavailable,
    /// The issuer failed; the message is also in `IdentityState::error`.
    #[error("station id generation failed: {0}")]
    GenerationFailed(String),
}

struct Inner {
    store: IdentityStore,
    cache: StationCache,
    issuer: Arc<dyn StationIssuer>,
    hints: ClientHints,
}

impl Inner {
    /// One Initializing → Ready/Idle pass. Caller must have won `try_begin`.
    async fn initialize(self: Arc<Self>) {
        if let Some(id) = self.cached().await {
            tracing::debug!(station = id.short(), "Reusing persisted station id");
            self.store.finish(Ok(id));
            return;
        }

        match self.issuer.issue(&self.hints.restamped()).await {
            Ok(id) => {
                if !self.persist(&id).await {
                    tracing::warn!("Station id not persisted; next start will issue a new one");
                }
                tracing::info!(station = id.short(), "Station id issued");
                self.store.finish(Ok(id));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Station id generation failed");
                self.store.finish(Err(e.to_string()));
            }
        }
    }

    // Storage backends may touch the filesystem, so cache calls run on the
    // blocking pool. A panicking backend counts as unavailable.

    async fn cached(self: &Arc<Self>) -> Option<StationId> {
        let this = Arc::clone(self);
        tokio::task::spawn_blocking(move || this.cache.read())
            .await
            .ok()
            .flatten()
    }

    async fn persist(self: &Arc<Self>, id: &StationId) -> bool {
        let this = Arc::clone(self);
        let id = id.clone();
        tokio::task::spawn_blocking(move || this.cache.write(&id))
            .await
            .unwrap_or(false)
    }

    async fn forget(self: &Arc<Self>) -> bool {
        let this = Arc::clone(self);
        tokio::task::spawn_blocking(move || this.cache.clear())
            .await
            .unwrap_or(false)
    }

    /// Run one attempt under a supervisor task. Neither task belongs to the
    /// caller, so a panicking issuer still lands the store in Idle.
    fn launch(self: &Arc<Self>) {
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let attempt = tokio::spawn(Arc::clone(&inner).initialize());
            if let Err(e) = attempt.await {
                tracing::error!(error = %e, "Station id initialization task died");
                inner.store.finish(Err(format!("initialization task failed: {e}")));
            }
        });
    }
}

/// Shared handle to the station identity.
#[derive(Clone)]
pub struct StationHandle {
    inner: Arc<Inner>,
}

impl StationHandle {
    pub fn new(cache: StationCache, issuer: Arc<dyn StationIssuer>, hints: ClientHints) -> Self {
        Self {
            inner: Arc::new(Inner {
                store: IdentityStore::new(),
                cache,
                issuer,
                hints,
            }),
        }
    }

    pub fn store(&self) -> &IdentityStore {
        &self.inner.store
    }

    pub fn cache(&self) -> &StationCache {
        &self.inner.cache
    }

    pub fn snapshot(&self) -> IdentityState {
        self.inner.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<IdentityState> {
        self.inner.store.subscribe()
    }

    /// The current id, or `Unavailable`. Never waits.
    pub fn require_id(&self) -> Result<StationId, IdentityError> {
        self.inner.store.id().ok_or(IdentityError::Unavailable)
    }

    /// Make sure a station id exists, loading or issuing one if needed.
    ///
    /// With an id present this touches nothing and returns it. With an
    /// attempt already in flight it waits for that attempt. Otherwise it
    /// starts one. Every caller of a given attempt gets the same result.
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn ensure_initialized(&self) -> Result<StationId, IdentityError> {
        if self.inner.store.try_begin() {
            self.inner.launch();
        }
        self.wait_settled().await
    }

    /// Wait until no attempt is in flight and report where it landed.
    pub async fn wait_settled(&self) -> Result<StationId, IdentityError> {
        let mut rx = self.inner.store.subscribe();
        let state = rx
            .wait_for(IdentityState::is_settled)
            .await
            .map_err(|_| IdentityError::Unavailable)?
            .clone();
        match (state.id, state.error) {
            (Some(id), _) => Ok(id),
            (None, Some(message)) => Err(IdentityError::GenerationFailed(message)),
            (None, None) => Err(IdentityError::Unavailable),
        }
    }

    /// Drop the in-memory id and initialize again. The persisted record is
    /// kept, so this normally reloads the same id without a network call.
    pub async fn refresh(&self) -> Result<StationId, IdentityError> {
        self.inner.store.clear();
        self.ensure_initialized().await
    }

    /// Forget the id everywhere and obtain a fresh one from the issuer.
    pub async fn reset(&self) -> Result<StationId, IdentityError> {
        self.inner.store.clear();
        if !self.inner.forget().await {
            tracing::warn!("Persisted station id could not be removed during reset");
        }
        self.ensure_initialized().await
    }
}

// ============================================================================
// Tests
// ============================================================================
