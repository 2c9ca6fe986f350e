//! Resilience
//!
//! Explicit retry wrapper for the identity provider handshake. Nothing in the
//! core path retries on its own.

pub mod retry;

pub use retry::{
    AcbsRetryExecutor, RetryConfig, RetryExecutor, RetryStats, RetryingTokenProvider,
};
