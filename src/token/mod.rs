//! Token Management
//!
//! ID token caching and the identity provider handshake.

pub mod authenticator;
pub mod cache;

pub use authenticator::{MockTokenProvider, SessionAuthenticator, TokenProvider};
pub use cache::TokenCache;
