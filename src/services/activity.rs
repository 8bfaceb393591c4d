//! Activity watcher producing debounced "user is active" ticks.
//!
//! DESIGN
//! ======
//! Pointer movement, key presses, scrolling, and touch starts all count as
//! the same evidence of activity. The watcher subscribes to each configured
//! kind and funnels raw events into one task. That task owns the single
//! pending timer: every event resets it, and the callback fires only once
//! the timer runs out with no further events.
//!
//! Teardown drops every listener subscription and aborts the task, which
//! also discards a pending timer.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::trace;
use uuid::Uuid;

use crate::error::SessionError;
use crate::subscription::Subscription;

pub const DEFAULT_ACTIVITY_DEBOUNCE_MS: u64 = 1000;

// =============================================================================
// ACTIVITY KINDS
// =============================================================================

/// Interaction signal treated as evidence of activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    PointerMove,
    KeyPress,
    Scroll,
    TouchStart,
}

impl ActivityKind {
    pub const ALL: [Self; 4] = [Self::PointerMove, Self::KeyPress, Self::Scroll, Self::TouchStart];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PointerMove => "pointermove",
            Self::KeyPress => "keypress",
            Self::Scroll => "scroll",
            Self::TouchStart => "touchstart",
        }
    }
}

impl FromStr for ActivityKind {
    type Err = SessionError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pointermove" | "mousemove" | "move" => Ok(Self::PointerMove),
            "keypress" | "keydown" | "key" => Ok(Self::KeyPress),
            "scroll" => Ok(Self::Scroll),
            "touchstart" | "touch" => Ok(Self::TouchStart),
            other => Err(SessionError::Config(format!("unknown activity kind: {other}"))),
        }
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ACTIVITY SOURCE
// =============================================================================

/// Listener invoked for each raw activity event.
pub type ActivityListener = Arc<dyn Fn(ActivityKind) + Send + Sync>;

/// Where raw interaction events come from.
pub trait ActivitySource: Send + Sync {
    /// Install `listener` for `kind`; the returned handle removes it.
    fn listen(&self, kind: ActivityKind, listener: ActivityListener) -> Subscription;
}

type ListenerMap = HashMap<ActivityKind, Vec<(Uuid, ActivityListener)>>;

/// In-process event bus acting as an [`ActivitySource`].
#[derive(Clone, Default)]
pub struct ActivityBus {
    listeners: Arc<Mutex<ListenerMap>>,
}

impl ActivityBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver one raw event. Returns how many listeners received it.
    pub fn emit(&self, kind: ActivityKind) -> usize {
        let targets: Vec<ActivityListener> = self
            .lock()
            .get(&kind)
            .map(|entries| entries.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default();
        for listener in &targets {
            listener(kind);
        }
        targets.len()
    }

    /// Total installed listeners across all kinds.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.lock().values().map(Vec::len).sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ListenerMap> {
        self.listeners
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl ActivitySource for ActivityBus {
    fn listen(&self, kind: ActivityKind, listener: ActivityListener) -> Subscription {
        let id = Uuid::new_v4();
        self.lock().entry(kind).or_default().push((id, listener));

        let listeners = Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            let Some(listeners) = listeners.upgrade() else {
                return;
            };
            let mut map = listeners
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(entries) = map.get_mut(&kind) {
                entries.retain(|(entry_id, _)| *entry_id != id);
                if entries.is_empty() {
                    map.remove(&kind);
                }
            }
        })
    }
}

// =============================================================================
// WATCHER
// =============================================================================

/// Mounted watcher. Dropping it is the teardown.
pub struct ActivityWatcher {
    subscriptions: Vec<Subscription>,
    task: JoinHandle<()>,
}

impl ActivityWatcher {
    /// Install listeners for `kinds` on `source` and start debouncing.
    ///
    /// `on_active` runs once per quiet period of length `debounce`.
    /// Must be called from within a Tokio runtime.
    pub fn mount<F>(source: &dyn ActivitySource, kinds: &[ActivityKind], debounce: Duration, on_active: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriptions = kinds
            .iter()
            .map(|&kind| {
                let tx = tx.clone();
                source.listen(
                    kind,
                    Arc::new(move |kind| {
                        // Closed means the watcher is gone; late events are dropped.
                        let _ = tx.send(kind);
                    }),
                )
            })
            .collect();

        let task = tokio::spawn(debounce_loop(rx, debounce, on_active));
        Self { subscriptions, task }
    }

    /// Number of listeners this watcher holds.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Explicit teardown; equivalent to dropping the watcher.
    pub fn unmount(self) {}
}

impl Drop for ActivityWatcher {
    fn drop(&mut self) {
        self.task.abort();
        self.subscriptions.clear();
    }
}

async fn debounce_loop<F>(mut rx: mpsc::UnboundedReceiver<ActivityKind>, debounce: Duration, on_active: F)
where
    F: Fn(),
{
    let pending = tokio::time::sleep(debounce);
    tokio::pin!(pending);
    let mut armed = false;

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(kind) = event else {
                    break;
                };
                trace!(%kind, "activity");
                pending.as_mut().reset(Instant::now() + debounce);
                armed = true;
            }
            () = &mut pending, if armed => {
                armed = false;
                on_active();
            }
        }
    }
}

#[cfg(test)]
#[path = "activity_test.rs"]
mod tests;
