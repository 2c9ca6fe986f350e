//! Configuration Types
//!
//! Connection settings for the ACBS identity provider and the main ACBS
//! endpoint. Both are immutable once built.

use secrecy::SecretString;
use std::time::Duration;
use url::Url;

/// Identity provider configuration (credentials and connection limits).
#[derive(Clone)]
pub struct AcbsAuthConfig {
    /// Identity provider base URL, e.g. `https://acbs.example.com/auth`.
    pub base_url: Url,
    /// Login name sent when creating a session.
    pub login_name: String,
    /// Password sent when creating a session.
    pub password: SecretString,
    /// API key sent on both handshake requests.
    pub api_key: SecretString,
    /// Header carrying the API key.
    pub api_key_header_name: String,
    /// Client id for the token exchange.
    pub client_id: String,
    /// How long a fetched ID token is reused.
    pub id_token_cache_ttl: Duration,
    /// Timeout for each handshake request.
    pub timeout: Duration,
    /// Maximum redirects followed per request.
    pub max_redirects: usize,
    /// Handshake retries performed by the retry policy (0 disables).
    pub max_retries: u32,
    /// Delay between handshake retries.
    pub retry_delay: Duration,
}

impl AcbsAuthConfig {
    /// Session creation endpoint.
    pub fn sessions_url(&self) -> Url {
        join_path(&self.base_url, "sessions")
    }

    /// ID token endpoint including the `client_id` query parameter.
    pub fn id_token_url(&self) -> Url {
        let mut url = join_path(&self.base_url, "idptoken/openid-connect");
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id);
        url
    }
}

impl std::fmt::Debug for AcbsAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcbsAuthConfig")
            .field("base_url", &self.base_url.as_str())
            .field("login_name", &self.login_name)
            .field("password", &"[REDACTED]")
            .field("api_key", &"[REDACTED]")
            .field("api_key_header_name", &self.api_key_header_name)
            .field("client_id", &self.client_id)
            .field("id_token_cache_ttl", &self.id_token_cache_ttl)
            .field("timeout", &self.timeout)
            .field("max_redirects", &self.max_redirects)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .finish()
    }
}

/// Main ACBS endpoint configuration.
#[derive(Clone, Debug)]
pub struct AcbsConfig {
    /// ACBS API base URL, e.g. `https://acbs.example.com/api/v1`.
    pub base_url: Url,
    /// Timeout for each backend request.
    pub timeout: Duration,
    /// Maximum redirects followed per request.
    pub max_redirects: usize,
}

impl AcbsConfig {
    /// Absolute URL of a path below the base URL.
    pub fn url_for(&self, path: &str) -> Url {
        join_path(&self.base_url, path)
    }
}

/// Append `path` to the base URL path, keeping any existing prefix.
pub(crate) fn join_path(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    let joined = format!(
        "{}/{}",
        base.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url.set_path(&joined);
    url
}

/// Default configuration values.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_REDIRECTS: usize = 5;
pub const DEFAULT_ID_TOKEN_CACHE_TTL_MS: u64 = 1_800_000;
pub const DEFAULT_API_KEY_HEADER_NAME: &str = "x-api-key";
pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_config(base: &str) -> AcbsAuthConfig {
        AcbsAuthConfig {
            base_url: Url::parse(base).unwrap(),
            login_name: "acbs-user".to_string(),
            password: SecretString::new("hunter2".to_string()),
            api_key: SecretString::new("key".to_string()),
            api_key_header_name: DEFAULT_API_KEY_HEADER_NAME.to_string(),
            client_id: "client-id".to_string(),
            id_token_cache_ttl: Duration::from_millis(DEFAULT_ID_TOKEN_CACHE_TTL_MS),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            max_retries: 0,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }

    #[test]
    fn test_auth_endpoints_keep_base_path() {
        let config = auth_config("https://acbs.example.com/auth/v1/");
        assert_eq!(
            config.sessions_url().as_str(),
            "https://acbs.example.com/auth/v1/sessions"
        );
        assert_eq!(
            config.id_token_url().as_str(),
            "https://acbs.example.com/auth/v1/idptoken/openid-connect?client_id=client-id"
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let output = format!("{:?}", auth_config("https://acbs.example.com"));
        assert!(!output.contains("hunter2"));
        assert!(output.contains("[REDACTED]"));
    }

    #[test]
    fn test_url_for() {
        let config = AcbsConfig {
            base_url: Url::parse("https://acbs.example.com/api/v1").unwrap(),
            timeout: Duration::from_secs(30),
            max_redirects: 5,
        };
        assert_eq!(
            config.url_for("/BundleInformation").as_str(),
            "https://acbs.example.com/api/v1/BundleInformation"
        );
        assert_eq!(
            config.url_for("Portfolio/E1/Facility/0030000321").as_str(),
            "https://acbs.example.com/api/v1/Portfolio/E1/Facility/0030000321"
        );
    }
}
