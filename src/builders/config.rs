//! Configuration Builder
//!
//! Fluent builders for the identity provider and backend configuration, with
//! optional loading from `ACBS_*` environment variables.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::error::ConfigurationError;
use crate::types::{
    AcbsAuthConfig, AcbsConfig, DEFAULT_API_KEY_HEADER_NAME, DEFAULT_ID_TOKEN_CACHE_TTL_MS,
    DEFAULT_MAX_REDIRECTS, DEFAULT_RETRY_DELAY_MS, DEFAULT_TIMEOUT_MS,
};

const ENV_BASE_URL: &str = "ACBS_BASE_URL";
const ENV_TIMEOUT: &str = "ACBS_TIMEOUT";
const ENV_MAX_REDIRECTS: &str = "ACBS_MAX_REDIRECTS";

const ENV_AUTH_BASE_URL: &str = "ACBS_AUTHENTICATION_BASE_URL";
const ENV_AUTH_LOGIN_NAME: &str = "ACBS_AUTHENTICATION_LOGIN_NAME";
const ENV_AUTH_PASSWORD: &str = "ACBS_AUTHENTICATION_PASSWORD";
const ENV_AUTH_API_KEY: &str = "ACBS_AUTHENTICATION_API_KEY";
const ENV_AUTH_API_KEY_HEADER_NAME: &str = "ACBS_AUTHENTICATION_API_KEY_HEADER_NAME";
const ENV_AUTH_CLIENT_ID: &str = "ACBS_AUTHENTICATION_CLIENT_ID";
const ENV_AUTH_CACHE_TTL: &str = "ACBS_AUTHENTICATION_ID_TOKEN_CACHE_TTL_IN_MILLISECONDS";
const ENV_AUTH_TIMEOUT: &str = "ACBS_AUTHENTICATION_TIMEOUT";
const ENV_AUTH_MAX_REDIRECTS: &str = "ACBS_AUTHENTICATION_MAX_REDIRECTS";
const ENV_AUTH_MAX_RETRIES: &str = "ACBS_AUTHENTICATION_MAX_NUMBER_OF_RETRIES";
const ENV_AUTH_RETRY_DELAY: &str = "ACBS_AUTHENTICATION_RETRY_DELAY_IN_MILLISECONDS";

/// Identity provider configuration builder.
#[derive(Default)]
pub struct AcbsAuthConfigBuilder {
    base_url: Option<String>,
    login_name: Option<String>,
    password: Option<SecretString>,
    api_key: Option<SecretString>,
    api_key_header_name: Option<String>,
    client_id: Option<String>,
    id_token_cache_ttl: Option<Duration>,
    timeout: Option<Duration>,
    max_redirects: Option<usize>,
    max_retries: Option<u32>,
    retry_delay: Option<Duration>,
    env_error: Option<ConfigurationError>,
}

impl AcbsAuthConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn login_name(mut self, login_name: impl Into<String>) -> Self {
        self.login_name = Some(login_name.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::new(password.into()));
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(api_key.into()));
        self
    }

    /// Header carrying the API key (defaults to `x-api-key`).
    pub fn api_key_header_name(mut self, name: impl Into<String>) -> Self {
        self.api_key_header_name = Some(name.into());
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn id_token_cache_ttl(mut self, ttl: Duration) -> Self {
        self.id_token_cache_ttl = Some(ttl);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = Some(max_redirects);
        self
    }

    /// Handshake retries for the retry executor. Zero disables retrying.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Variables that are unset leave the builder untouched.
    pub fn from_env(self) -> Self {
        self.from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup(ENV_AUTH_BASE_URL) {
            self.base_url = Some(val);
        }
        if let Some(val) = lookup(ENV_AUTH_LOGIN_NAME) {
            self.login_name = Some(val);
        }
        if let Some(val) = lookup(ENV_AUTH_PASSWORD) {
            self.password = Some(SecretString::new(val));
        }
        if let Some(val) = lookup(ENV_AUTH_API_KEY) {
            self.api_key = Some(SecretString::new(val));
        }
        if let Some(val) = lookup(ENV_AUTH_API_KEY_HEADER_NAME) {
            self.api_key_header_name = Some(val);
        }
        if let Some(val) = lookup(ENV_AUTH_CLIENT_ID) {
            self.client_id = Some(val);
        }

        match parse_var(&lookup, ENV_AUTH_CACHE_TTL) {
            Ok(Some(ms)) => self.id_token_cache_ttl = Some(Duration::from_millis(ms)),
            Ok(None) => {}
            Err(e) => {
                self.env_error.get_or_insert(e);
            }
        }
        match parse_var(&lookup, ENV_AUTH_TIMEOUT) {
            Ok(Some(ms)) => self.timeout = Some(Duration::from_millis(ms)),
            Ok(None) => {}
            Err(e) => {
                self.env_error.get_or_insert(e);
            }
        }
        match parse_var(&lookup, ENV_AUTH_MAX_REDIRECTS) {
            Ok(Some(n)) => self.max_redirects = Some(n),
            Ok(None) => {}
            Err(e) => {
                self.env_error.get_or_insert(e);
            }
        }
        match parse_var(&lookup, ENV_AUTH_MAX_RETRIES) {
            Ok(Some(n)) => self.max_retries = Some(n),
            Ok(None) => {}
            Err(e) => {
                self.env_error.get_or_insert(e);
            }
        }
        match parse_var(&lookup, ENV_AUTH_RETRY_DELAY) {
            Ok(Some(ms)) => self.retry_delay = Some(Duration::from_millis(ms)),
            Ok(None) => {}
            Err(e) => {
                self.env_error.get_or_insert(e);
            }
        }

        self
    }

    /// Build the identity provider configuration.
    pub fn build(self) -> Result<AcbsAuthConfig, ConfigurationError> {
        if let Some(e) = self.env_error {
            return Err(e);
        }

        let base_url = parse_base_url(self.base_url, "base_url")?;
        let login_name = required(self.login_name, "login_name")?;
        let password = required_secret(self.password, "password")?;
        let api_key = required_secret(self.api_key, "api_key")?;
        let client_id = required(self.client_id, "client_id")?;

        let api_key_header_name = self
            .api_key_header_name
            .unwrap_or_else(|| DEFAULT_API_KEY_HEADER_NAME.to_string());
        if api_key_header_name.trim().is_empty() {
            return Err(ConfigurationError::MissingRequired {
                field: "api_key_header_name".to_string(),
            });
        }

        let timeout = positive(
            self.timeout
                .unwrap_or(Duration::from_millis(DEFAULT_TIMEOUT_MS)),
            "timeout",
        )?;
        let id_token_cache_ttl = self
            .id_token_cache_ttl
            .unwrap_or(Duration::from_millis(DEFAULT_ID_TOKEN_CACHE_TTL_MS));

        Ok(AcbsAuthConfig {
            base_url,
            login_name,
            password,
            api_key,
            api_key_header_name,
            client_id,
            id_token_cache_ttl,
            timeout,
            max_redirects: self.max_redirects.unwrap_or(DEFAULT_MAX_REDIRECTS),
            max_retries: self.max_retries.unwrap_or(0),
            retry_delay: self
                .retry_delay
                .unwrap_or(Duration::from_millis(DEFAULT_RETRY_DELAY_MS)),
        })
    }
}

/// Backend endpoint configuration builder.
#[derive(Default)]
pub struct AcbsConfigBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    max_redirects: Option<usize>,
    env_error: Option<ConfigurationError>,
}

impl AcbsConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = Some(max_redirects);
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env(self) -> Self {
        self.from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup(ENV_BASE_URL) {
            self.base_url = Some(val);
        }
        match parse_var(&lookup, ENV_TIMEOUT) {
            Ok(Some(ms)) => self.timeout = Some(Duration::from_millis(ms)),
            Ok(None) => {}
            Err(e) => {
                self.env_error.get_or_insert(e);
            }
        }
        match parse_var(&lookup, ENV_MAX_REDIRECTS) {
            Ok(Some(n)) => self.max_redirects = Some(n),
            Ok(None) => {}
            Err(e) => {
                self.env_error.get_or_insert(e);
            }
        }
        self
    }

    /// Build the backend configuration.
    pub fn build(self) -> Result<AcbsConfig, ConfigurationError> {
        if let Some(e) = self.env_error {
            return Err(e);
        }

        Ok(AcbsConfig {
            base_url: parse_base_url(self.base_url, "base_url")?,
            timeout: positive(
                self.timeout
                    .unwrap_or(Duration::from_millis(DEFAULT_TIMEOUT_MS)),
                "timeout",
            )?,
            max_redirects: self.max_redirects.unwrap_or(DEFAULT_MAX_REDIRECTS),
        })
    }
}

impl AcbsAuthConfig {
    pub fn builder() -> AcbsAuthConfigBuilder {
        AcbsAuthConfigBuilder::new()
    }

    /// Read the configuration from `ACBS_AUTHENTICATION_*` variables.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        AcbsAuthConfigBuilder::new().from_env().build()
    }
}

impl AcbsConfig {
    pub fn builder() -> AcbsConfigBuilder {
        AcbsConfigBuilder::new()
    }

    /// Read the configuration from `ACBS_*` variables.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        AcbsConfigBuilder::new().from_env().build()
    }
}

/// Create a new identity provider configuration builder.
pub fn acbs_auth_config() -> AcbsAuthConfigBuilder {
    AcbsAuthConfigBuilder::new()
}

/// Create a new backend configuration builder.
pub fn acbs_config() -> AcbsConfigBuilder {
    AcbsConfigBuilder::new()
}

fn parse_var<F, T>(lookup: &F, name: &str) -> Result<Option<T>, ConfigurationError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigurationError::InvalidConfig {
                message: format!("{} is not a valid number: {:?}", name, raw),
            }),
        None => Ok(None),
    }
}

fn parse_base_url(value: Option<String>, field: &str) -> Result<Url, ConfigurationError> {
    let raw = required(value, field)?;
    let url = Url::parse(&raw).map_err(|_| ConfigurationError::InvalidEndpoint { url: raw.clone() })?;

    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ConfigurationError::InvalidEndpoint { url: raw });
    }

    Ok(url)
}

fn required(value: Option<String>, field: &str) -> Result<String, ConfigurationError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigurationError::MissingRequired {
            field: field.to_string(),
        })
}

fn required_secret(
    value: Option<SecretString>,
    field: &str,
) -> Result<SecretString, ConfigurationError> {
    value
        .filter(|v| !v.expose_secret().is_empty())
        .ok_or_else(|| ConfigurationError::MissingRequired {
            field: field.to_string(),
        })
}

fn positive(duration: Duration, field: &str) -> Result<Duration, ConfigurationError> {
    if duration.is_zero() {
        return Err(ConfigurationError::InvalidConfig {
            message: format!("{} must be greater than zero", field),
        });
    }
    Ok(duration)
}
