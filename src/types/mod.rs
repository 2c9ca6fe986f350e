//! ACBS Types
//!
//! Configuration, identity provider payloads and bundle definitions.

pub mod bundle;
pub mod config;
pub mod token;

pub use bundle::*;
pub use config::*;
pub use token::*;
