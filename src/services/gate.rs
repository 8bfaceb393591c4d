//! Access gate: holds protected content until the session has resolved.
//!
//! DESIGN
//! ======
//! On mount the gate shows `Checking`. It waits until the session leaves
//! `Unknown` or `settle_timeout` elapses, whichever comes first. Then:
//! - authenticated: `Content(user)`
//! - anything else: one redirect to the sign-in path (plus one notice in
//!   the user-facing variant), then `Redirected`
//!
//! After settling it keeps following the store. A later logout redirects
//! once more, and a later sign-in shows the content again.
//!
//! TRADE-OFFS
//! ==========
//! The timeout is a heuristic. If persisted state takes longer than
//! `settle_timeout` to resolve, a signed-in user is redirected anyway.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::store::SessionStore;
use crate::providers::{Navigator, Notifier};
use crate::types::{SessionState, User};

pub const DEFAULT_GATE_SETTLE_MS: u64 = 300;
pub const DEFAULT_SIGN_IN_PATH: &str = "/signin";
pub const DEFAULT_SIGN_IN_NOTICE: &str = "Please sign in to continue.";

/// Settle timing and redirect target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// Upper bound on how long to wait for the session to resolve.
    pub settle_timeout: Duration,
    pub sign_in_path: String,
    /// Message shown on redirect. `None` is the silent variant.
    pub notice: Option<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            settle_timeout: Duration::from_millis(DEFAULT_GATE_SETTLE_MS),
            sign_in_path: DEFAULT_SIGN_IN_PATH.to_owned(),
            notice: Some(DEFAULT_SIGN_IN_NOTICE.to_owned()),
        }
    }
}

/// What the guarded view should currently show.
#[derive(Debug, Clone, PartialEq)]
pub enum GateView {
    /// Neutral loading indicator only.
    Checking,
    /// Render the protected content for this user.
    Content(User),
    /// Access denied; the redirect has been issued.
    Redirected,
}

/// Mounted gate. Dropping it stops all further evaluation.
pub struct AccessGate {
    view: watch::Receiver<GateView>,
    task: JoinHandle<()>,
}

impl AccessGate {
    /// Mount a gate over `store`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn mount(
        store: &SessionStore,
        navigator: Arc<dyn Navigator>,
        notifier: Option<Arc<dyn Notifier>>,
        config: GateConfig,
    ) -> Self {
        let (view_tx, view) = watch::channel(GateView::Checking);
        let outputs = GateOutputs { navigator, notifier, config };
        let task = tokio::spawn(run_gate(store.subscribe(), view_tx, outputs));
        Self { view, task }
    }

    /// Current view.
    #[must_use]
    pub fn view(&self) -> GateView {
        self.view.borrow().clone()
    }

    /// Wait until the gate has left `Checking` and return the view.
    pub async fn settled(&mut self) -> GateView {
        if let Ok(view) = self.view.wait_for(|view| *view != GateView::Checking).await {
            return view.clone();
        }
        // task gone; report whatever it left behind
        self.view()
    }

    /// Wait for a view change not yet observed through `settled` or `changed`.
    pub async fn changed(&mut self) -> Option<GateView> {
        self.view.changed().await.ok()?;
        Some(self.view.borrow_and_update().clone())
    }

    /// Explicit teardown; equivalent to dropping the gate.
    pub fn unmount(self) {}
}

impl Drop for AccessGate {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct GateOutputs {
    navigator: Arc<dyn Navigator>,
    notifier: Option<Arc<dyn Notifier>>,
    config: GateConfig,
}

async fn run_gate(mut state: watch::Receiver<SessionState>, view: watch::Sender<GateView>, outputs: GateOutputs) {
    let settle_timeout = outputs.config.settle_timeout;
    let resolved = tokio::time::timeout(settle_timeout, async {
        let _ = state.wait_for(|s| !s.is_unknown()).await;
    })
    .await
    .is_ok();
    debug!(resolved, "access gate settled");

    loop {
        let current = state.borrow_and_update().clone();
        apply(&current, &view, &outputs);
        if state.changed().await.is_err() {
            break;
        }
    }
}

fn apply(state: &SessionState, view: &watch::Sender<GateView>, outputs: &GateOutputs) {
    match state {
        SessionState::Authenticated(user) => {
            view.send_if_modified(|current| {
                if matches!(current, GateView::Content(shown) if shown == user) {
                    return false;
                }
                *current = GateView::Content(user.clone());
                true
            });
        }
        SessionState::Unknown | SessionState::Unauthenticated => {
            if *view.borrow() == GateView::Redirected {
                return;
            }
            info!(path = %outputs.config.sign_in_path, state = state.label(), "access denied; redirecting");
            outputs.navigator.redirect(&outputs.config.sign_in_path);
            if let (Some(notifier), Some(notice)) = (&outputs.notifier, &outputs.config.notice) {
                notifier.notify(notice);
            }
            view.send_replace(GateView::Redirected);
        }
    }
}

#[cfg(test)]
#[path = "gate_test.rs"]
mod tests;
