//! Token Cache
//!
//! Holds at most one ID token together with the instant it was fetched.

use parking_lot::RwLock;
use std::time::Duration;
use tracing::trace;

use crate::core::Clock;
use crate::types::CachedToken;

/// Single-entry ID token cache with a fixed time-to-live.
pub struct TokenCache<C: Clock> {
    ttl: Duration,
    clock: C,
    entry: RwLock<Option<CachedToken>>,
}

impl<C: Clock> TokenCache<C> {
    /// Create an empty cache.
    pub fn new(ttl: Duration, clock: C) -> Self {
        Self {
            ttl,
            clock,
            entry: RwLock::new(None),
        }
    }

    /// Token value if one is cached and `now < fetched_at + ttl`.
    pub fn get_valid(&self) -> Option<String> {
        let entry = self.entry.read();
        let token = entry.as_ref()?;
        let now = self.clock.now();

        if token.is_valid_at(now, self.ttl) {
            trace!(age = ?token.age(now), "Using cached ID token");
            Some(token.secret().to_string())
        } else {
            trace!(age = ?token.age(now), "Cached ID token expired");
            None
        }
    }

    /// Replace the cached token, stamping it with the current time.
    pub fn store(&self, token: impl Into<String>) {
        let fetched_at = self.clock.now();
        *self.entry.write() = Some(CachedToken::new(token, fetched_at));
    }

    /// Drop the cached token.
    pub fn invalidate(&self) {
        *self.entry.write() = None;
    }

    /// Cached entry regardless of validity.
    pub fn cached(&self) -> Option<CachedToken> {
        self.entry.read().clone()
    }

    pub fn is_valid(&self) -> bool {
        self.get_valid().is_some()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
