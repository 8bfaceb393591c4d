//! External collaborators the session layer talks to.
//!
//! SYSTEM CONTEXT
//! ==============
//! The identity provider pushes auth changes; the backend traits resolve,
//! refresh, and revoke credentials; `Navigator` and `Notifier` are the
//! user-facing outputs of the access gate. `http` and `local` hold the
//! concrete implementations used by the binary.

pub mod http;
pub mod local;

use std::sync::Arc;

use crate::error::SessionError;
use crate::subscription::Subscription;
use crate::types::{AuthSignal, Credential, RefreshedCredential, User};

/// Callback invoked for every provider auth state change.
pub type AuthCallback = Arc<dyn Fn(AuthSignal) + Send + Sync>;

/// Source of authoritative auth state changes.
pub trait IdentityProvider: Send + Sync {
    /// Register `callback`; the returned handle unsubscribes on drop.
    fn on_auth_state_changed(&self, callback: AuthCallback) -> Subscription;
}

#[async_trait::async_trait]
pub trait UserResolver: Send + Sync {
    /// Resolve the user that owns `credential`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Resolve`] if the credential is invalid or the
    /// backend is unreachable.
    async fn resolve_user(&self, credential: &Credential) -> Result<User, SessionError>;
}

#[async_trait::async_trait]
pub trait CredentialRefresher: Send + Sync {
    /// Extend the validity of `credential`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Refresh`] on any backend failure.
    async fn refresh_credential(&self, credential: &Credential) -> Result<RefreshedCredential, SessionError>;
}

#[async_trait::async_trait]
pub trait CredentialRevoker: Send + Sync {
    /// Best-effort remote revocation.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Revoke`] on failure; callers may ignore it.
    async fn revoke_credential(&self, credential: &Credential) -> Result<(), SessionError>;
}

/// Redirect-to-path output of the access gate.
pub trait Navigator: Send + Sync {
    fn redirect(&self, path: &str);
}

/// Fire-and-forget user-visible message.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// The three remote collaborators a `SessionStore` needs.
#[derive(Clone)]
pub struct SessionBackends {
    pub resolver: Arc<dyn UserResolver>,
    pub refresher: Arc<dyn CredentialRefresher>,
    pub revoker: Arc<dyn CredentialRevoker>,
}

impl SessionBackends {
    /// Use one implementation for all three roles.
    pub fn from_shared<B>(backend: Arc<B>) -> Self
    where
        B: UserResolver + CredentialRefresher + CredentialRevoker + 'static,
    {
        Self { resolver: backend.clone(), refresher: backend.clone(), revoker: backend }
    }
}
