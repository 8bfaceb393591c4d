//! Session synchronizer: feeds provider events and activity ticks into store calls.
//!
//! DESIGN
//! ======
//! Provider callbacks and debounced activity ticks are pushed onto one
//! unbounded queue. A single task drains it and awaits each reconciliation
//! before taking the next event, so a sign-out can never interleave with
//! an in-flight sign-in fetch.
//!
//! Reconciliation:
//! - provider authenticated: `fetch_user`; on failure, `logout`
//! - provider unauthenticated: `logout`
//!
//! Refresh policy: on each activity tick, refresh iff
//! `now > expires_at - refresh_window`. Refresh only ever follows activity,
//! so an idle session is never refreshed.
//!
//! TRADE-OFFS
//! ==========
//! A failed refresh is never escalated to a logout. A session whose
//! refreshes keep failing simply runs out at its natural expiry.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::activity::{ActivityKind, ActivitySource, ActivityWatcher, DEFAULT_ACTIVITY_DEBOUNCE_MS};
use super::store::SessionStore;
use crate::error::SessionError;
use crate::providers::IdentityProvider;
use crate::subscription::Subscription;
use crate::types::{AuthSignal, SessionState, User};

pub const DEFAULT_REFRESH_WINDOW_SECS: u64 = 3600;

/// Timing knobs for the synchronizer and its activity watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Lead time before expiry in which activity triggers a refresh.
    pub refresh_window: Duration,
    /// Quiet period before activity counts as one tick.
    pub activity_debounce: Duration,
    /// Interaction signals that count as activity.
    pub activity_kinds: Vec<ActivityKind>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            refresh_window: Duration::from_secs(DEFAULT_REFRESH_WINDOW_SECS),
            activity_debounce: Duration::from_millis(DEFAULT_ACTIVITY_DEBOUNCE_MS),
            activity_kinds: ActivityKind::ALL.to_vec(),
        }
    }
}

// =============================================================================
// REFRESH POLICY
// =============================================================================

/// Whether a session expiring at `expires_at_ms` is due for refresh at `now_ms`.
#[must_use]
pub fn refresh_due(now_ms: i64, expires_at_ms: i64, window: Duration) -> bool {
    let window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
    now_ms > expires_at_ms.saturating_sub(window_ms)
}

/// What an activity tick decided.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshDecision {
    /// Nobody is signed in; nothing was called.
    NoSession,
    /// Expiry is still outside the refresh window.
    NotDue,
    Refreshed(User),
    /// A logout or new sign-in replaced the session mid-refresh; the result was discarded.
    Superseded,
    /// The refresh call failed; the existing session was kept.
    Failed,
}

/// Evaluate the refresh policy once against the store's current user.
pub async fn on_activity_tick(store: &SessionStore, window: Duration) -> RefreshDecision {
    let Some(user) = store.current_user() else {
        debug!("activity tick without session; skipping refresh check");
        return RefreshDecision::NoSession;
    };

    let now = store.now_ms();
    if !refresh_due(now, user.expires_at, window) {
        debug!(user_id = %user.id, expires_at = user.expires_at, now, "session not due for refresh");
        return RefreshDecision::NotDue;
    }

    match store.refresh_session().await {
        Ok(user) => RefreshDecision::Refreshed(user),
        Err(SessionError::NoSession) => RefreshDecision::NoSession,
        Err(SessionError::Superseded) => {
            debug!(user_id = %user.id, "refresh superseded by a newer session change");
            RefreshDecision::Superseded
        }
        // logged by the store
        Err(_) => RefreshDecision::Failed,
    }
}

// =============================================================================
// RECONCILIATION
// =============================================================================

/// Apply one provider signal to the store and return the resulting state.
pub async fn reconcile(store: &SessionStore, signal: AuthSignal) -> SessionState {
    match signal {
        AuthSignal::Authenticated(principal) => {
            debug!(uid = %principal.uid, "provider reports authenticated");
            match store.fetch_user(principal.credential).await {
                Ok(_) => {}
                Err(SessionError::Superseded) => {
                    debug!(uid = %principal.uid, "sign-in superseded by a newer session change");
                }
                Err(e) => {
                    warn!(uid = %principal.uid, error = %e, "user fetch failed; logging out");
                    store.logout().await;
                }
            }
        }
        AuthSignal::Unauthenticated => {
            debug!("provider reports unauthenticated");
            store.logout().await;
        }
    }
    store.state()
}

// =============================================================================
// SYNCHRONIZER
// =============================================================================

enum SyncEvent {
    Auth(AuthSignal),
    Activity,
}

/// Mounted synchronizer. Dropping it tears down the provider subscription,
/// the activity watcher, and the event loop.
pub struct SessionSynchronizer {
    subscription: Option<Subscription>,
    watcher: Option<ActivityWatcher>,
    task: JoinHandle<()>,
}

impl SessionSynchronizer {
    /// Subscribe to `provider`, watch `activity`, and start reconciling into `store`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn mount(
        store: SessionStore,
        provider: &dyn IdentityProvider,
        activity: &dyn ActivitySource,
        config: &SyncConfig,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_loop(store, rx, config.refresh_window));

        // The provider may replay its current state before this returns.
        let auth_tx = tx.clone();
        let subscription = provider.on_auth_state_changed(Arc::new(move |signal| {
            let _ = auth_tx.send(SyncEvent::Auth(signal));
        }));

        let watcher = ActivityWatcher::mount(activity, &config.activity_kinds, config.activity_debounce, move || {
            let _ = tx.send(SyncEvent::Activity);
        });

        info!(
            refresh_window_secs = config.refresh_window.as_secs(),
            debounce_ms = u64::try_from(config.activity_debounce.as_millis()).unwrap_or(u64::MAX),
            kinds = config.activity_kinds.len(),
            "session synchronizer mounted"
        );

        Self { subscription: Some(subscription), watcher: Some(watcher), task }
    }

    /// Explicit teardown; equivalent to dropping the synchronizer.
    pub fn unmount(self) {}
}

impl Drop for SessionSynchronizer {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        drop(self.watcher.take());
        self.task.abort();
        debug!("session synchronizer unmounted");
    }
}

async fn run_loop(store: SessionStore, mut rx: mpsc::UnboundedReceiver<SyncEvent>, refresh_window: Duration) {
    while let Some(event) = rx.recv().await {
        match event {
            SyncEvent::Auth(signal) => {
                let state = reconcile(&store, signal).await;
                debug!(state = state.label(), "reconciled provider signal");
            }
            SyncEvent::Activity => {
                let decision = on_activity_tick(&store, refresh_window).await;
                debug!(?decision, "activity tick evaluated");
            }
        }
    }
}

#[cfg(test)]
#[path = "sync_test.rs"]
mod tests;
