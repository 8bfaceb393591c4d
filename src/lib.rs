//! # session-keeper
//!
//! Client-side session lifecycle manager. It mirrors an identity
//! provider's auth state into a local [`SessionStore`], refreshes the
//! session ahead of expiry when the user is active, and gates protected
//! views until the session state is known.
//!
//! Components are mounted against a store and torn down by dropping them:
//! [`SessionSynchronizer`] (provider events and activity-driven refresh),
//! [`ActivityWatcher`] (debounced interaction signals), and [`AccessGate`]
//! (settle-then-redirect guard).

pub mod clock;
pub mod config;
pub mod error;
pub mod providers;
pub mod services;
pub mod storage;
pub mod subscription;
pub mod types;

#[cfg(test)]
mod test_helpers;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SessionConfig;
pub use error::{SessionError, StorageError};
pub use providers::{
    AuthCallback, CredentialRefresher, CredentialRevoker, IdentityProvider, Navigator, Notifier, SessionBackends,
    UserResolver,
};
pub use services::activity::{ActivityBus, ActivityKind, ActivitySource, ActivityWatcher};
pub use services::gate::{AccessGate, GateConfig, GateView};
pub use services::store::SessionStore;
pub use services::sync::{RefreshDecision, SessionSynchronizer, SyncConfig, refresh_due};
pub use storage::{JsonFileStorage, MemoryStorage, SessionStorage};
pub use subscription::Subscription;
pub use types::{AuthSignal, Credential, PersistedSession, Principal, RefreshedCredential, SessionState, User};
