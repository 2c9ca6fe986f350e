//! Session Authenticator
//!
//! Obtains ID tokens from the ACBS identity provider through a two-step
//! handshake: a session is created with the login credentials, then the
//! session cookie is exchanged for an ID token. Tokens are served from the
//! cache while fresh, and concurrent callers that find the cache empty share a
//! single in-flight handshake.

use async_trait::async_trait;
use parking_lot::Mutex;
use secrecy::ExposeSecret;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::core::{
    extract_session_id, session_cookie_header, Clock, HttpRequest, HttpResponse, HttpTransport,
    SystemClock,
};
use crate::error::{AuthenticationError, BackendFailure};
use crate::token::TokenCache;
use crate::types::{AcbsAuthConfig, IdTokenResponse, SessionRequestBody};

/// Source of valid ID tokens (for dependency injection).
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Get a valid ID token, running the handshake if none is cached.
    async fn get_valid_token(&self) -> Result<String, AuthenticationError>;

    /// Discard any cached token so the next call authenticates again.
    fn invalidate(&self);
}

/// Identity provider client with a TTL token cache.
pub struct SessionAuthenticator<T: HttpTransport, C: Clock = SystemClock> {
    config: AcbsAuthConfig,
    transport: Arc<T>,
    cache: TokenCache<C>,
    /// Serializes handshakes; holds the failure of the most recent one.
    gate: tokio::sync::Mutex<Option<AuthenticationError>>,
    /// Number of handshakes that have run to completion.
    completed: AtomicU64,
}

impl<T: HttpTransport> SessionAuthenticator<T, SystemClock> {
    /// Create an authenticator using the system clock.
    pub fn new(config: AcbsAuthConfig, transport: Arc<T>) -> Self {
        Self::with_clock(config, transport, SystemClock)
    }
}

impl<T: HttpTransport, C: Clock> SessionAuthenticator<T, C> {
    /// Create an authenticator with an injected time source.
    pub fn with_clock(config: AcbsAuthConfig, transport: Arc<T>, clock: C) -> Self {
        let cache = TokenCache::new(config.id_token_cache_ttl, clock);
        Self {
            config,
            transport,
            cache,
            gate: tokio::sync::Mutex::new(None),
            completed: AtomicU64::new(0),
        }
    }

    pub fn cache(&self) -> &TokenCache<C> {
        &self.cache
    }

    pub fn config(&self) -> &AcbsAuthConfig {
        &self.config
    }

    /// Get a valid ID token.
    ///
    /// Callers that wait on a handshake started by another caller receive
    /// that handshake's result, success or failure.
    pub async fn get_valid_token(&self) -> Result<String, AuthenticationError> {
        if let Some(token) = self.cache.get_valid() {
            return Ok(token);
        }

        let observed = self.completed.load(Ordering::Acquire);
        let mut last_failure = self.gate.lock().await;

        if let Some(token) = self.cache.get_valid() {
            return Ok(token);
        }
        if self.completed.load(Ordering::Acquire) != observed {
            if let Some(error) = last_failure.as_ref() {
                debug!("Sharing failure of concurrent handshake");
                return Err(error.clone());
            }
        }

        let result = self.handshake().await;
        match &result {
            Ok(token) => {
                self.cache.store(token.as_str());
                *last_failure = None;
            }
            Err(e) => {
                warn!(error = %e, "Identity provider handshake failed");
                *last_failure = Some(e.clone());
            }
        }
        self.completed.fetch_add(1, Ordering::AcqRel);

        result
    }

    #[instrument(skip(self), level = "debug")]
    async fn handshake(&self) -> Result<String, AuthenticationError> {
        let session_id = self.create_session().await?;
        debug!("Created identity provider session");
        let token = self.fetch_id_token(&session_id).await?;
        debug!("Obtained ID token");
        Ok(token)
    }

    async fn create_session(&self) -> Result<String, AuthenticationError> {
        let body = SessionRequestBody {
            login_name: &self.config.login_name,
            password: self.config.password.expose_secret(),
        };

        let request = HttpRequest::post(self.config.sessions_url().as_str())
            .header(
                &self.config.api_key_header_name,
                self.config.api_key.expose_secret().as_str(),
            )
            .timeout(self.config.timeout)
            .json(&body)
            .map_err(|e| AuthenticationError::SessionRequestFailed {
                source: BackendFailure::Transport(e),
            })?;

        let response = self
            .send(request)
            .await
            .map_err(|source| AuthenticationError::SessionRequestFailed { source })?;

        extract_session_id(response.header_values("set-cookie"))
            .ok_or(AuthenticationError::SessionCookieMissing)
    }

    async fn fetch_id_token(&self, session_id: &str) -> Result<String, AuthenticationError> {
        let request = HttpRequest::get(self.config.id_token_url().as_str())
            .header("content-type", "application/x-www-form-urlencoded")
            .header("cookie", session_cookie_header(session_id))
            .header(
                &self.config.api_key_header_name,
                self.config.api_key.expose_secret().as_str(),
            )
            .timeout(self.config.timeout);

        let response = self
            .send(request)
            .await
            .map_err(|source| AuthenticationError::TokenRequestFailed { source })?;

        serde_json::from_str::<IdTokenResponse>(&response.body)
            .ok()
            .as_ref()
            .and_then(IdTokenResponse::token)
            .map(str::to_string)
            .ok_or(AuthenticationError::IdTokenMissing)
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, BackendFailure> {
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(BackendFailure::Status {
                status: response.status,
                body: response.body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl<T: HttpTransport, C: Clock> TokenProvider for SessionAuthenticator<T, C> {
    async fn get_valid_token(&self) -> Result<String, AuthenticationError> {
        SessionAuthenticator::get_valid_token(self).await
    }

    fn invalidate(&self) {
        self.cache.invalidate();
    }
}

/// Mock token provider for testing.
///
/// Queued results are returned first; afterwards the default token is served.
pub struct MockTokenProvider {
    default_token: Mutex<Option<String>>,
    results: Mutex<VecDeque<Result<String, AuthenticationError>>>,
    call_count: AtomicUsize,
    invalidate_count: AtomicUsize,
}

impl MockTokenProvider {
    /// Create a provider that always returns `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            default_token: Mutex::new(Some(token.into())),
            results: Mutex::new(VecDeque::new()),
            call_count: AtomicUsize::new(0),
            invalidate_count: AtomicUsize::new(0),
        }
    }

    /// Create a provider with no default token.
    pub fn failing(error: AuthenticationError) -> Self {
        let provider = Self::new(String::new());
        *provider.default_token.lock() = None;
        provider.queue_result(Err(error));
        provider
    }

    /// Queue a result for the next call.
    pub fn queue_result(&self, result: Result<String, AuthenticationError>) -> &Self {
        self.results.lock().push_back(result);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn invalidate_count(&self) -> usize {
        self.invalidate_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenProvider for MockTokenProvider {
    async fn get_valid_token(&self) -> Result<String, AuthenticationError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        let queued = self.results.lock().pop_front();
        if let Some(result) = queued {
            return result;
        }

        self.default_token
            .lock()
            .clone()
            .ok_or(AuthenticationError::IdTokenMissing)
    }

    fn invalidate(&self) {
        self.invalidate_count.fetch_add(1, Ordering::SeqCst);
    }
}
