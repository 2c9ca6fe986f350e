//! ACBS Integration Module
//!
//! Resilience layer for talking to the ACBS loan servicing backend.
//!
//! # Features
//!
//! - Two-step identity provider handshake (session cookie, then ID token)
//! - TTL ID token cache with a single in-flight handshake
//! - Classification of the backend's inconsistent failure responses
//! - Bundle information submission with `Location`/body identifier lookup
//! - Opt-in retry of transient handshake failures
//!
//! # Example
//!
//! ```rust,ignore
//! use acbs_integration::{acbs_auth_config, acbs_config, AcbsClient, BundleInformationRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = acbs_config()
//!         .base_url("https://acbs.example.com/api/v1")
//!         .build()?;
//!
//!     let auth_config = acbs_auth_config()
//!         .base_url("https://acbs.example.com/auth")
//!         .login_name("svc-gateway")
//!         .password("password")
//!         .api_key("api-key")
//!         .client_id("gateway")
//!         .build()?;
//!
//!     let client = AcbsClient::new(config, auth_config)?;
//!
//!     let request = BundleInformationRequest::new(messages);
//!     let outcome = client.submit_bundle(&request).await?;
//!     println!("Bundle identifier: {}", outcome.bundle_identifier);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: configuration, identity provider payloads and bundle messages
//! - `error`: classified error taxonomy and the response classifier
//! - `core`: HTTP transport, clock and session cookie handling
//! - `token`: token cache and session authenticator
//! - `resilience`: retry wrapper for the handshake
//! - `bundle`: bundle submission
//! - `builders`: fluent builders for configuration
//! - `client`: high-level client combining all functionality

pub mod builders;
pub mod bundle;
pub mod client;
pub mod core;
pub mod error;
pub mod resilience;
pub mod token;
pub mod types;

// Re-export main client
pub use client::{acbs_client, AcbsClient};

// Re-export builders
pub use builders::{acbs_auth_config, acbs_config, AcbsAuthConfigBuilder, AcbsConfigBuilder};

// Re-export errors
pub use error::{
    classify, classify_failure, AcbsError, AcbsResult, AuthenticationError, BackendBody,
    BackendFailure, ConfigurationError, ResourceKind, TransportError,
    UNEXPECTED_RESPONSE_MESSAGE,
};

// Re-export types
pub use types::{
    // Config
    AcbsAuthConfig, AcbsConfig,
    // Token
    CachedToken, IdTokenResponse,
    // Bundle
    BundleInformationRequest, BundleMessage, BundleOutcome, Currency,
    FacilityAmountTransaction, FacilityCodeValueTransaction, FacilityFeeAmountTransaction,
    FacilityTransactionCodeValue, LenderType, LoanAdvanceTransaction, NewLoanRequest,
    TransactionType,
};

// Re-export core components
pub use crate::core::{
    // Transport
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, MockHttpTransport,
    ReqwestHttpTransport,
    // Clock
    Clock, MockClock, SystemClock,
    // Cookies
    extract_session_id, SESSION_COOKIE_NAME,
};

// Re-export token management
pub use token::{MockTokenProvider, SessionAuthenticator, TokenCache, TokenProvider};

// Re-export resilience
pub use resilience::{
    AcbsRetryExecutor, RetryConfig, RetryExecutor, RetryStats, RetryingTokenProvider,
};

// Re-export bundle submission
pub use bundle::{BundleSubmitter, DefaultBundleSubmitter, MockBundleSubmitter};
