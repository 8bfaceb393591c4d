//! Session store: the single owner of `SessionState`.
//!
//! DESIGN
//! ======
//! State lives in a `watch` channel so readers can snapshot it and the
//! access gate can await changes. Only `fetch_user`, `refresh_session`,
//! `logout`, and the one-shot `rehydrate` write to it.
//!
//! Every mutation that starts or ends a session bumps an epoch counter.
//! A collaborator call that completes after the epoch moved belongs to a
//! session that no longer exists and is discarded as `Superseded`.
//!
//! ERROR HANDLING
//! ==============
//! Fetch and refresh failures are returned unchanged; the store never
//! demotes itself. Storage failures are logged and ignored, since the
//! in-memory state is authoritative for the running process.
//! Storage is written synchronously before each operation returns. See
//! `storage` for the blocking cost of the file binding.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::SessionError;
use crate::providers::SessionBackends;
use crate::storage::SessionStorage;
use crate::types::{Credential, PersistedSession, SessionState, User};

/// Process-wide session state holder. Clones share the same session.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    state: watch::Sender<SessionState>,
    credential: Mutex<Option<Credential>>,
    epoch: AtomicU64,
    rehydrated: AtomicBool,
    backends: SessionBackends,
    storage: Arc<dyn SessionStorage>,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    #[must_use]
    pub fn new(backends: SessionBackends, storage: Arc<dyn SessionStorage>, clock: Arc<dyn Clock>) -> Self {
        let (state, _) = watch::channel(SessionState::Unknown);
        Self {
            inner: Arc::new(StoreInner {
                state,
                credential: Mutex::new(None),
                epoch: AtomicU64::new(0),
                rehydrated: AtomicBool::new(false),
                backends,
                storage,
                clock,
            }),
        }
    }

    // =========================================================================
    // READ ACCESS
    // =========================================================================

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.inner.state.borrow().user().cloned()
    }

    /// Receiver that observes every state change from now on.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Current time according to the store's clock.
    #[must_use]
    pub fn now_ms(&self) -> i64 {
        self.inner.clock.now_ms()
    }

    // =========================================================================
    // REHYDRATION
    // =========================================================================

    /// Restore a persisted session. Reads storage at most once per store.
    ///
    /// Returns `true` if a live session was restored. An expired persisted
    /// session is cleared instead. State that has already left `Unknown`
    /// (the provider got there first) is never overwritten.
    pub fn rehydrate(&self) -> bool {
        if self.inner.rehydrated.swap(true, Ordering::SeqCst) {
            return false;
        }

        let persisted = match self.inner.storage.load() {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!(error = %e, "session rehydration failed; starting without a session");
                return false;
            }
        };
        let Some(persisted) = persisted else {
            debug!("no persisted session");
            return false;
        };

        if persisted.user.is_expired_at(self.now_ms()) {
            info!(user_id = %persisted.user.id, "persisted session expired; discarding");
            self.clear_storage();
            return false;
        }

        let restored = self.inner.state.send_if_modified(|state| {
            if !state.is_unknown() {
                return false;
            }
            *state = SessionState::Authenticated(persisted.user.clone());
            true
        });
        if restored {
            *self.lock_credential() = Some(persisted.credential);
            info!(user_id = %persisted.user.id, "session restored from storage");
        }
        restored
    }

    // =========================================================================
    // OPERATIONS
    // =========================================================================

    /// Resolve the user behind `credential` and make it the current session.
    ///
    /// # Errors
    ///
    /// Propagates the resolver's error. Returns [`SessionError::Superseded`]
    /// if a logout or another sign-in completed while the call was in flight.
    pub async fn fetch_user(&self, credential: Credential) -> Result<User, SessionError> {
        let epoch = self.epoch();
        let user = self.inner.backends.resolver.resolve_user(&credential).await?;

        if self.epoch() != epoch {
            debug!(user_id = %user.id, "discarding stale user fetch");
            return Err(SessionError::Superseded);
        }

        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        *self.lock_credential() = Some(credential.clone());
        self.inner
            .state
            .send_replace(SessionState::Authenticated(user.clone()));
        self.persist(&user, credential);
        info!(user_id = %user.id, expires_at = user.expires_at, "session authenticated");
        Ok(user)
    }

    /// Extend the current session.
    ///
    /// On success the `User` is replaced as a whole with the refreshed
    /// expiry and claims. On failure the existing session stays valid.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoSession`] without contacting the backend
    /// when nobody is signed in, the refresher's error on failure, or
    /// [`SessionError::Superseded`] if the session changed meanwhile.
    pub async fn refresh_session(&self) -> Result<User, SessionError> {
        let epoch = self.epoch();
        let held = self.lock_credential().clone();
        let (Some(user), Some(credential)) = (self.current_user(), held) else {
            return Err(SessionError::NoSession);
        };

        let refreshed = match self
            .inner
            .backends
            .refresher
            .refresh_credential(&credential)
            .await
        {
            Ok(refreshed) => refreshed,
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "session refresh failed; keeping current session");
                return Err(e);
            }
        };

        if self.epoch() != epoch {
            debug!(user_id = %user.id, "discarding stale refresh");
            return Err(SessionError::Superseded);
        }

        let next = user.refreshed(&refreshed);
        let credential = refreshed.credential.unwrap_or(credential);
        *self.lock_credential() = Some(credential.clone());
        self.inner
            .state
            .send_replace(SessionState::Authenticated(next.clone()));
        self.persist(&next, credential);
        info!(user_id = %next.id, expires_at = next.expires_at, "session refreshed");
        Ok(next)
    }

    /// Clear the session locally, then revoke remotely on a best-effort basis.
    ///
    /// Always completes. Calling it again is a no-op apart from re-asserting
    /// `Unauthenticated`; the remote is only contacted when a credential
    /// was held.
    pub async fn logout(&self) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        let credential = self.lock_credential().take();
        let previous = self.inner.state.send_replace(SessionState::Unauthenticated);
        self.clear_storage();

        if let Some(user) = previous.user() {
            info!(user_id = %user.id, "session logged out");
        }

        let Some(credential) = credential else {
            return;
        };
        if let Err(e) = self
            .inner
            .backends
            .revoker
            .revoke_credential(&credential)
            .await
        {
            warn!(error = %e, "remote revoke failed; local session already cleared");
        }
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn epoch(&self) -> u64 {
        self.inner.epoch.load(Ordering::SeqCst)
    }

    fn lock_credential(&self) -> std::sync::MutexGuard<'_, Option<Credential>> {
        self.inner
            .credential
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn persist(&self, user: &User, credential: Credential) {
        let session = PersistedSession { user: user.clone(), credential };
        if let Err(e) = self.inner.storage.save(&session) {
            warn!(user_id = %user.id, error = %e, "failed to persist session");
        }
    }

    fn clear_storage(&self) {
        if let Err(e) = self.inner.storage.clear() {
            warn!(error = %e, "failed to clear persisted session");
        }
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
