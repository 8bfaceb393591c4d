//! Session configuration parsed from environment variables.
//!
//! All timing values are optional and fall back to their defaults when the
//! variable is missing or unparsable. An explicit but invalid activity kind
//! list is an error, since silently watching nothing would disable refresh.

use std::time::Duration;

use crate::error::SessionError;
use crate::providers::http::{DEFAULT_HTTP_TIMEOUT_SECS, HttpBackendConfig};
use crate::services::activity::{ActivityKind, DEFAULT_ACTIVITY_DEBOUNCE_MS};
use crate::services::gate::{DEFAULT_GATE_SETTLE_MS, DEFAULT_SIGN_IN_NOTICE, DEFAULT_SIGN_IN_PATH, GateConfig};
use crate::services::sync::{DEFAULT_REFRESH_WINDOW_SECS, SyncConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub refresh_window: Duration,
    pub activity_debounce: Duration,
    pub activity_kinds: Vec<ActivityKind>,
    pub settle_timeout: Duration,
    pub sign_in_path: String,
    pub sign_in_notice: Option<String>,
    pub http_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_window: Duration::from_secs(DEFAULT_REFRESH_WINDOW_SECS),
            activity_debounce: Duration::from_millis(DEFAULT_ACTIVITY_DEBOUNCE_MS),
            activity_kinds: ActivityKind::ALL.to_vec(),
            settle_timeout: Duration::from_millis(DEFAULT_GATE_SETTLE_MS),
            sign_in_path: DEFAULT_SIGN_IN_PATH.to_owned(),
            sign_in_notice: Some(DEFAULT_SIGN_IN_NOTICE.to_owned()),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl SessionConfig {
    /// Build config from environment variables.
    ///
    /// Optional:
    /// - `SESSION_REFRESH_WINDOW_SECS`: default 3600
    /// - `SESSION_ACTIVITY_DEBOUNCE_MS`: default 1000
    /// - `SESSION_ACTIVITY_KINDS`: comma list of `pointermove`, `keypress`,
    ///   `scroll`, `touchstart` (default: all)
    /// - `SESSION_GATE_SETTLE_MS`: default 300
    /// - `SESSION_SIGN_IN_PATH`: default `/signin`
    /// - `SESSION_SIGN_IN_NOTICE`: redirect notice; empty disables it
    /// - `SESSION_HTTP_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] if `SESSION_ACTIVITY_KINDS` is set
    /// but names an unknown kind or no kinds at all.
    pub fn from_env() -> Result<Self, SessionError> {
        let activity_kinds = match std::env::var("SESSION_ACTIVITY_KINDS") {
            Ok(raw) => parse_activity_kinds(&raw)?,
            Err(_) => ActivityKind::ALL.to_vec(),
        };
        let sign_in_notice = match std::env::var("SESSION_SIGN_IN_NOTICE") {
            Ok(raw) if raw.trim().is_empty() => None,
            Ok(raw) => Some(raw),
            Err(_) => Some(DEFAULT_SIGN_IN_NOTICE.to_owned()),
        };

        Ok(Self {
            refresh_window: Duration::from_secs(env_parse("SESSION_REFRESH_WINDOW_SECS", DEFAULT_REFRESH_WINDOW_SECS)),
            activity_debounce: Duration::from_millis(env_parse(
                "SESSION_ACTIVITY_DEBOUNCE_MS",
                DEFAULT_ACTIVITY_DEBOUNCE_MS,
            )),
            activity_kinds,
            settle_timeout: Duration::from_millis(env_parse("SESSION_GATE_SETTLE_MS", DEFAULT_GATE_SETTLE_MS)),
            sign_in_path: std::env::var("SESSION_SIGN_IN_PATH").unwrap_or_else(|_| DEFAULT_SIGN_IN_PATH.to_owned()),
            sign_in_notice,
            http_timeout: Duration::from_secs(env_parse("SESSION_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)),
        })
    }

    #[must_use]
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            refresh_window: self.refresh_window,
            activity_debounce: self.activity_debounce,
            activity_kinds: self.activity_kinds.clone(),
        }
    }

    #[must_use]
    pub fn gate_config(&self) -> GateConfig {
        GateConfig {
            settle_timeout: self.settle_timeout,
            sign_in_path: self.sign_in_path.clone(),
            notice: self.sign_in_notice.clone(),
        }
    }

    #[must_use]
    pub fn http_config(&self, base_url: &str) -> HttpBackendConfig {
        HttpBackendConfig { base_url: base_url.to_owned(), timeout: self.http_timeout }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Parse a comma-separated activity kind list, dropping duplicates.
///
/// # Errors
///
/// Returns [`SessionError::Config`] on an unknown kind or an empty list.
pub fn parse_activity_kinds(raw: &str) -> Result<Vec<ActivityKind>, SessionError> {
    let mut kinds = Vec::new();
    for part in raw.split(',').filter(|p| !p.trim().is_empty()) {
        let kind: ActivityKind = part.parse()?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    if kinds.is_empty() {
        return Err(SessionError::Config("SESSION_ACTIVITY_KINDS names no activity kinds".into()));
    }
    Ok(kinds)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
