//! Builders
//!
//! Fluent builder patterns for ACBS configuration.

pub mod config;

pub use config::{acbs_auth_config, acbs_config, AcbsAuthConfigBuilder, AcbsConfigBuilder};
