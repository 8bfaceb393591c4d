//! Scoped subscription handle.
//!
//! DESIGN
//! ======
//! Every push-style registration (provider auth callbacks, activity
//! listeners) hands back a `Subscription`. Dropping it, or calling
//! [`Subscription::unsubscribe`], runs the release closure exactly once.

type Release = Box<dyn FnOnce() + Send>;

/// RAII guard pairing a subscribe with exactly one unsubscribe.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    release: Option<Release>,
}

impl Subscription {
    pub fn new<F>(release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self { release: Some(Box::new(release)) }
    }

    /// A subscription with nothing to release.
    pub fn noop() -> Self {
        Self { release: None }
    }

    /// Release now instead of at drop.
    pub fn unsubscribe(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

#[cfg(test)]
#[path = "subscription_test.rs"]
mod tests;
