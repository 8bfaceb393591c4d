//! In-process identity provider.
//!
//! DESIGN
//! ======
//! Sign-in and sign-out are pushed by the embedding code (the CLI reads
//! them from stdin). Like hosted identity SDKs, a new subscriber is
//! immediately told the last known signal, if there is one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;
use uuid::Uuid;

use super::{AuthCallback, IdentityProvider};
use crate::subscription::Subscription;
use crate::types::{AuthSignal, Principal};

#[derive(Default)]
struct ProviderInner {
    subscribers: HashMap<Uuid, AuthCallback>,
    last: Option<AuthSignal>,
}

/// Identity provider driven directly by the host process.
#[derive(Clone, Default)]
pub struct LocalIdentityProvider {
    inner: Arc<Mutex<ProviderInner>>,
}

impl LocalIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, principal: Principal) {
        self.publish(AuthSignal::Authenticated(principal));
    }

    pub fn sign_out(&self) {
        self.publish(AuthSignal::Unauthenticated);
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn publish(&self, signal: AuthSignal) {
        // Callbacks run outside the lock so they may re-enter the provider.
        let callbacks: Vec<AuthCallback> = {
            let mut inner = self.lock();
            inner.last = Some(signal.clone());
            inner.subscribers.values().cloned().collect()
        };
        debug!(subscribers = callbacks.len(), "publishing auth signal");
        for callback in callbacks {
            callback(signal.clone());
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ProviderInner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl IdentityProvider for LocalIdentityProvider {
    fn on_auth_state_changed(&self, callback: AuthCallback) -> Subscription {
        let id = Uuid::new_v4();
        let replay = {
            let mut inner = self.lock();
            inner.subscribers.insert(id, callback.clone());
            inner.last.clone()
        };
        if let Some(signal) = replay {
            callback(signal);
        }

        let inner = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .subscribers
                    .remove(&id);
            }
        })
    }
}

#[cfg(test)]
#[path = "local_test.rs"]
mod tests;
