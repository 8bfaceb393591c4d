//! Shared fakes for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::clock::ManualClock;
use crate::error::SessionError;
use crate::providers::{CredentialRefresher, CredentialRevoker, Navigator, Notifier, SessionBackends, UserResolver};
use crate::services::store::SessionStore;
use crate::storage::MemoryStorage;
use crate::types::{Credential, PersistedSession, RefreshedCredential, User};

pub const T0: i64 = 1_700_000_000_000;
pub const HOUR_MS: i64 = 3_600_000;

// =============================================================================
// MockBackend
// =============================================================================

/// Scripted backend. Empty queues fall back to the configured defaults.
pub struct MockBackend {
    pub resolve_results: Mutex<VecDeque<Result<User, SessionError>>>,
    pub refresh_results: Mutex<VecDeque<Result<RefreshedCredential, SessionError>>>,
    pub fail_revoke: bool,
    pub resolve_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub revoke_calls: AtomicUsize,
    pub seen_credentials: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            resolve_results: Mutex::new(VecDeque::new()),
            refresh_results: Mutex::new(VecDeque::new()),
            fail_revoke: false,
            resolve_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            revoke_calls: AtomicUsize::new(0),
            seen_credentials: Mutex::new(Vec::new()),
        }
    }

    pub fn push_resolve(&self, result: Result<User, SessionError>) {
        self.resolve_results.lock().unwrap().push_back(result);
    }

    pub fn push_refresh(&self, result: Result<RefreshedCredential, SessionError>) {
        self.refresh_results.lock().unwrap().push_back(result);
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn revoke_calls(&self) -> usize {
        self.revoke_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.resolve_calls() + self.refresh_calls() + self.revoke_calls()
    }
}

#[async_trait::async_trait]
impl UserResolver for MockBackend {
    async fn resolve_user(&self, credential: &Credential) -> Result<User, SessionError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_credentials
            .lock()
            .unwrap()
            .push(credential.expose().to_owned());
        self.resolve_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(User::new(format!("user-{}", credential.expose()), T0 + 2 * HOUR_MS)))
    }
}

#[async_trait::async_trait]
impl CredentialRefresher for MockBackend {
    async fn refresh_credential(&self, credential: &Credential) -> Result<RefreshedCredential, SessionError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_credentials
            .lock()
            .unwrap()
            .push(credential.expose().to_owned());
        self.refresh_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(RefreshedCredential { expires_at: T0 + 24 * HOUR_MS, credential: None, claims: serde_json::Map::new() })
            })
    }
}

#[async_trait::async_trait]
impl CredentialRevoker for MockBackend {
    async fn revoke_credential(&self, _credential: &Credential) -> Result<(), SessionError> {
        self.revoke_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_revoke { Err(SessionError::Revoke("boom".into())) } else { Ok(()) }
    }
}

// =============================================================================
// Navigator / Notifier
// =============================================================================

#[derive(Default)]
pub struct RecordingNavigator {
    pub redirects: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, path: &str) {
        self.redirects.lock().unwrap().push(path.to_owned());
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_owned());
    }
}

// =============================================================================
// Store fixtures
// =============================================================================

pub struct Fixture {
    pub store: SessionStore,
    pub backend: Arc<MockBackend>,
    pub storage: Arc<MemoryStorage>,
    pub clock: ManualClock,
}

pub fn fixture_with(backend: MockBackend, storage: MemoryStorage) -> Fixture {
    let backend = Arc::new(backend);
    let storage = Arc::new(storage);
    let clock = ManualClock::new(T0);
    let store = SessionStore::new(SessionBackends::from_shared(backend.clone()), storage.clone(), Arc::new(clock.clone()));
    Fixture { store, backend, storage, clock }
}

pub fn fixture() -> Fixture {
    fixture_with(MockBackend::new(), MemoryStorage::new())
}

pub fn persisted(user_id: &str, expires_at: i64) -> PersistedSession {
    PersistedSession { user: User::new(user_id, expires_at), credential: Credential::new(format!("tok-{user_id}")) }
}
