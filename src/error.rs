//! Error types shared by the session store, collaborators, and config.
//!
//! ERROR HANDLING
//! ==============
//! Every operation returns `Result`; nothing panics on a collaborator
//! failure. Callers interpret the variant: the synchronizer escalates
//! `Resolve` to a logout, while `Refresh` and `Revoke` are logged and dropped.

/// Failure surfaced by session operations and collaborator implementations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The operation needs an authenticated user and none is present.
    #[error("no active session")]
    NoSession,
    /// The user-resolution collaborator rejected the credential or failed.
    #[error("user resolution failed: {0}")]
    Resolve(String),
    /// The credential-refresh collaborator failed.
    #[error("credential refresh failed: {0}")]
    Refresh(String),
    /// Remote revocation failed. Only reported by collaborators; `logout` swallows it.
    #[error("credential revoke failed: {0}")]
    Revoke(String),
    /// The session ended or was replaced while the request was in flight.
    #[error("session changed while request was in flight")]
    Superseded,
    /// The persisted-session binding failed.
    #[error("session storage error: {0}")]
    Storage(#[from] StorageError),
    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    Config(String),
    /// The HTTP client could not be built.
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failure reading or writing the persisted session.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid session json: {0}")]
    Json(#[from] serde_json::Error),
}
