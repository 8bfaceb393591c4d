//! Session data model: users, credentials, provider signals, and state.
//!
//! DESIGN
//! ======
//! Timestamps are milliseconds since the Unix epoch (`i64`). Profile fields
//! beyond `id` and `expires_at` are carried as an opaque JSON map so the
//! session layer never interprets them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// CREDENTIAL
// =============================================================================

/// Opaque bearer credential. `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token value, for building request headers.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

// =============================================================================
// USER
// =============================================================================

/// Keys `User` serializes as typed fields rather than through `profile`.
const USER_FIELDS: [&str; 2] = ["id", "expires_at"];

/// The authenticated principal as resolved by the user-resolution backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Opaque identifier, stable for the lifetime of the session.
    pub id: String,
    /// Absolute expiry, milliseconds since the Unix epoch.
    pub expires_at: i64,
    /// Remaining profile fields, passed through untouched.
    #[serde(default, flatten)]
    pub profile: Map<String, Value>,
}

impl User {
    #[must_use]
    pub fn new(id: impl Into<String>, expires_at: i64) -> Self {
        Self { id: id.into(), expires_at, profile: Map::new() }
    }

    /// Build the replacement value after a successful refresh.
    ///
    /// Returns a new `User`; `self` is left as it was. Claims that name a
    /// typed field (`id`, `expires_at`) never enter the profile map, so the
    /// serialized user keeps unique keys.
    #[must_use]
    pub fn refreshed(&self, refreshed: &RefreshedCredential) -> Self {
        let mut profile = self.profile.clone();
        for (key, value) in &refreshed.claims {
            if USER_FIELDS.contains(&key.as_str()) {
                continue;
            }
            profile.insert(key.clone(), value.clone());
        }
        Self { id: self.id.clone(), expires_at: refreshed.expires_at, profile }
    }

    /// Whether the session has passed its absolute expiry at `now_ms`.
    #[must_use]
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at
    }
}

/// Result of a successful credential refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshedCredential {
    /// New absolute expiry, milliseconds since the Unix epoch.
    pub expires_at: i64,
    /// Rotated credential, when the backend issues a new one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<Credential>,
    /// Any other refreshed claims, merged over the user's profile.
    #[serde(default, flatten)]
    pub claims: Map<String, Value>,
}

// =============================================================================
// PROVIDER SIGNALS
// =============================================================================

/// Provider-side handle delivered with an "authenticated" signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub uid: String,
    pub credential: Credential,
}

/// Auth state change pushed by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthSignal {
    Authenticated(Principal),
    Unauthenticated,
}

// =============================================================================
// SESSION STATE
// =============================================================================

/// Locally mirrored session state. Owned exclusively by `SessionStore`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SessionState {
    /// Not yet confirmed either way.
    #[default]
    Unknown,
    Authenticated(User),
    Unauthenticated,
}

impl SessionState {
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::Unknown | Self::Unauthenticated => None,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Short label for logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Authenticated(_) => "authenticated",
            Self::Unauthenticated => "unauthenticated",
        }
    }
}

/// What the storage binding keeps across reloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub user: User,
    pub credential: Credential,
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
