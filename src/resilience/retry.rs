//! Retry Logic
//!
//! Opt-in retry for the identity provider handshake. Only failures caused by
//! the network or a 5xx/429 answer are repeated; a rejected login or a
//! malformed answer fails immediately.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::AuthenticationError;
use crate::token::TokenProvider;
use crate::types::AcbsAuthConfig;

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
    /// Jitter factor (0.0-1.0).
    pub jitter: f64,
}

impl RetryConfig {
    /// Fixed-delay policy from the identity provider settings.
    ///
    /// `max_retries` of zero yields a single attempt.
    pub fn from_auth_config(config: &AcbsAuthConfig) -> Self {
        Self {
            max_attempts: config.max_retries.saturating_add(1),
            initial_delay: config.retry_delay,
            max_delay: config.retry_delay,
            multiplier: 1.0,
            jitter: 0.0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_attempts > 1
    }
}

/// Retry executor interface.
#[async_trait]
pub trait RetryExecutor: Send + Sync {
    /// Execute an operation with retry logic.
    async fn execute<T, F, Fut>(&self, operation: F) -> Result<T, AuthenticationError>
    where
        T: Send,
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, AuthenticationError>> + Send;

    /// Check if an error is retryable.
    fn is_retryable(&self, error: &AuthenticationError) -> bool;

    /// Get retry statistics.
    fn get_stats(&self) -> RetryStats;
}

/// Retry statistics.
#[derive(Debug, Clone, Default)]
pub struct RetryStats {
    pub total_attempts: u32,
    pub successful_retries: u32,
    pub failed_operations: u32,
}

/// Backoff retry executor for handshake failures.
pub struct AcbsRetryExecutor {
    config: RetryConfig,
    stats: Mutex<RetryStats>,
}

impl AcbsRetryExecutor {
    /// Create new retry executor.
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            stats: Mutex::new(RetryStats::default()),
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_delay = self.config.initial_delay.as_millis() as f64
            * self.config.multiplier.powi(attempt as i32);

        let capped_delay = base_delay.min(self.config.max_delay.as_millis() as f64);

        let jitter_range = capped_delay * self.config.jitter;
        let jitter = (rand::random::<f64>() - 0.5) * 2.0 * jitter_range;
        let final_delay = (capped_delay + jitter).max(0.0);

        Duration::from_millis(final_delay as u64)
    }
}

#[async_trait]
impl RetryExecutor for AcbsRetryExecutor {
    async fn execute<T, F, Fut>(&self, operation: F) -> Result<T, AuthenticationError>
    where
        T: Send,
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, AuthenticationError>> + Send,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            self.stats.lock().total_attempts += 1;

            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        self.stats.lock().successful_retries += 1;
                    }
                    return Ok(result);
                }
                Err(error) => {
                    if !self.is_retryable(&error) || attempt + 1 >= max_attempts {
                        self.stats.lock().failed_operations += 1;
                        return Err(error);
                    }

                    let delay = self.calculate_delay(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Retrying identity provider handshake"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn is_retryable(&self, error: &AuthenticationError) -> bool {
        error.is_retryable()
    }

    fn get_stats(&self) -> RetryStats {
        self.stats.lock().clone()
    }
}

/// Token provider that retries the wrapped provider's handshake.
pub struct RetryingTokenProvider<E: RetryExecutor = AcbsRetryExecutor> {
    inner: Arc<dyn TokenProvider>,
    executor: E,
}

impl RetryingTokenProvider<AcbsRetryExecutor> {
    pub fn new(inner: Arc<dyn TokenProvider>, config: RetryConfig) -> Self {
        Self::with_executor(inner, AcbsRetryExecutor::new(config))
    }
}

impl<E: RetryExecutor> RetryingTokenProvider<E> {
    pub fn with_executor(inner: Arc<dyn TokenProvider>, executor: E) -> Self {
        Self { inner, executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }
}

#[async_trait]
impl<E: RetryExecutor> TokenProvider for RetryingTokenProvider<E> {
    async fn get_valid_token(&self) -> Result<String, AuthenticationError> {
        let inner = &self.inner;
        let result = self
            .executor
            .execute(|| async move { inner.get_valid_token().await })
            .await;
        if result.is_ok() {
            debug!(stats = ?self.executor.get_stats(), "Handshake retry stats");
        }
        result
    }

    fn invalidate(&self) {
        self.inner.invalidate();
    }
}
