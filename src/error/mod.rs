//! ACBS Error Types
//!
//! `AcbsError` is the classified taxonomy every public operation resolves to.
//! The remaining enums describe causes: raw backend failures, transport
//! failures, authentication handshake failures and configuration problems.

pub mod classifier;

pub use classifier::{
    classify, classify_failure, BackendBody, ResourceKind, UNEXPECTED_RESPONSE_MESSAGE,
};

use std::time::Duration;
use thiserror::Error;

/// Classified error returned by every backend operation.
#[derive(Error, Debug, Clone)]
pub enum AcbsError {
    /// The identity provider handshake failed. Never exposed in detail to
    /// external callers.
    #[error(transparent)]
    AuthenticationFailed(#[from] AuthenticationError),

    #[error("Resource not found")]
    NotFound { detail: Option<String> },

    #[error("Bad request: {detail}")]
    BadRequest { detail: String },

    #[error("Internal server error: {detail}")]
    InternalServerError { detail: String },
}

impl AcbsError {
    pub(crate) fn not_found(detail: impl Into<String>) -> Self {
        Self::NotFound {
            detail: Some(detail.into()),
        }
    }

    pub(crate) fn bad_request(detail: impl Into<String>) -> Self {
        Self::BadRequest {
            detail: detail.into(),
        }
    }

    pub(crate) fn internal(detail: impl Into<String>) -> Self {
        Self::InternalServerError {
            detail: detail.into(),
        }
    }

    /// Get error code for telemetry.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed(_) => "ACBS_AUTHENTICATION",
            Self::NotFound { .. } => "ACBS_NOT_FOUND",
            Self::BadRequest { .. } => "ACBS_BAD_REQUEST",
            Self::InternalServerError { .. } => "ACBS_INTERNAL",
        }
    }

    /// HTTP status the outermost boundary should answer with.
    ///
    /// Authentication failures surface as a generic 500.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::BadRequest { .. } => 400,
            Self::AuthenticationFailed(_) | Self::InternalServerError { .. } => 500,
        }
    }

    /// Message safe to return to an external caller.
    ///
    /// Bad requests keep the backend's message attached; authentication and
    /// internal failures are reduced to a generic text.
    pub fn public_message(&self) -> String {
        match self {
            Self::NotFound { .. } => "Not found".to_string(),
            Self::BadRequest { detail } => format!("Bad request: {}", detail),
            Self::AuthenticationFailed(_) | Self::InternalServerError { .. } => {
                "Internal server error".to_string()
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Identity provider handshake error.
#[derive(Error, Debug, Clone)]
pub enum AuthenticationError {
    #[error("Failed to create a session with the identity provider.")]
    SessionRequestFailed {
        #[source]
        source: BackendFailure,
    },

    #[error("Session cookie was not returned by the identity provider.")]
    SessionCookieMissing,

    #[error("Failed to get a token from the identity provider.")]
    TokenRequestFailed {
        #[source]
        source: BackendFailure,
    },

    #[error("ID token was not returned by the identity provider.")]
    IdTokenMissing,
}

impl AuthenticationError {
    /// Check if a new handshake attempt could succeed.
    ///
    /// Only request failures caused by the network or a 5xx/429 answer are
    /// worth repeating.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::SessionRequestFailed { source } | Self::TokenRequestFailed { source } => {
                source.is_retryable()
            }
            Self::SessionCookieMissing | Self::IdTokenMissing => false,
        }
    }
}

/// Raw, uninterpreted failure of a backend call.
#[derive(Error, Debug, Clone)]
pub enum BackendFailure {
    #[error("Backend responded with status {status}")]
    Status { status: u16, body: String },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl BackendFailure {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(_) => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Transport(e) => e.is_retryable(),
        }
    }
}

/// Network/transport error.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Request timeout after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Too many redirects: {message}")]
    TooManyRedirects { message: String },

    #[error("Request failed: {message}")]
    RequestFailed { message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },
}

impl TransportError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConnectionFailed { .. } | Self::Timeout { .. })
    }
}

/// Configuration error.
#[derive(Error, Debug, Clone)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Missing required field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid endpoint URL: {url}")]
    InvalidEndpoint { url: String },

    #[error("Failed to create HTTP client: {message}")]
    HttpClient { message: String },
}

/// Result type for ACBS operations.
pub type AcbsResult<T> = Result<T, AcbsError>;
