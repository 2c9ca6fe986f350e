//! Token Types
//!
//! Identity provider payloads and the cached ID token.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Body of the session creation request.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionRequestBody<'a> {
    pub login_name: &'a str,
    pub password: &'a str,
}

/// Body returned by the ID token endpoint.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct IdTokenResponse {
    #[serde(default)]
    pub id_token: Option<String>,
}

impl IdTokenResponse {
    /// The token, if present and non-empty.
    ///
    /// Some identity provider versions serialize an absent token as the
    /// literal strings `null` or `undefined`.
    pub fn token(&self) -> Option<&str> {
        self.id_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty() && *token != "null" && *token != "undefined")
    }
}

/// ID token held by the token cache.
#[derive(Clone)]
pub struct CachedToken {
    value: SecretString,
    /// When the handshake that produced the token completed.
    pub fetched_at: Instant,
}

impl CachedToken {
    pub fn new(value: impl Into<String>, fetched_at: Instant) -> Self {
        Self {
            value: SecretString::new(value.into()),
            fetched_at,
        }
    }

    /// Token value (for the Authorization header).
    pub fn secret(&self) -> &str {
        self.value.expose_secret()
    }

    /// Valid while `now < fetched_at + ttl`.
    pub fn is_valid_at(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.fetched_at) < ttl
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.fetched_at)
    }
}

impl std::fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedToken")
            .field("value", &"[REDACTED]")
            .field("fetched_at", &self.fetched_at)
            .finish()
    }
}
