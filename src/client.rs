//! ACBS Client
//!
//! High-level client combining the identity provider handshake, bundle
//! submission and typed reads and writes against the backend.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::bundle::submitter::{last_path_segment, EMPTY_BUNDLE_MESSAGE};
use crate::bundle::{BundleSubmitter, DefaultBundleSubmitter};
use crate::core::{HttpRequest, HttpResponse, HttpTransport, ReqwestHttpTransport};
use crate::error::{
    classify, classify_failure, AcbsError, AcbsResult, BackendBody, BackendFailure,
    ConfigurationError, ResourceKind, UNEXPECTED_RESPONSE_MESSAGE,
};
use crate::resilience::{RetryConfig, RetryingTokenProvider};
use crate::token::{SessionAuthenticator, TokenProvider};
use crate::types::{AcbsAuthConfig, AcbsConfig, BundleInformationRequest, BundleOutcome};

/// ACBS client.
pub struct AcbsClient<T: HttpTransport = ReqwestHttpTransport> {
    config: AcbsConfig,
    transport: Arc<T>,
    token_provider: Arc<dyn TokenProvider>,
    submitter: Arc<dyn BundleSubmitter>,
}

impl AcbsClient<ReqwestHttpTransport> {
    /// Create a client with reqwest transports for the backend and the
    /// identity provider.
    ///
    /// The handshake is wrapped in the retry policy when the identity provider
    /// configuration asks for retries.
    pub fn new(config: AcbsConfig, auth_config: AcbsAuthConfig) -> Result<Self, ConfigurationError> {
        let auth_transport = Arc::new(ReqwestHttpTransport::new(
            auth_config.timeout,
            auth_config.max_redirects,
        )?);
        let retry_config = RetryConfig::from_auth_config(&auth_config);
        let authenticator: Arc<dyn TokenProvider> =
            Arc::new(SessionAuthenticator::new(auth_config, auth_transport));

        let token_provider: Arc<dyn TokenProvider> = if retry_config.is_enabled() {
            Arc::new(RetryingTokenProvider::new(authenticator, retry_config))
        } else {
            authenticator
        };

        let transport = Arc::new(ReqwestHttpTransport::new(
            config.timeout,
            config.max_redirects,
        )?);

        Ok(Self::with_components(config, transport, token_provider))
    }

    /// Create a client from `ACBS_*` and `ACBS_AUTHENTICATION_*` variables.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::new(AcbsConfig::from_env()?, AcbsAuthConfig::from_env()?)
    }
}

impl<T: HttpTransport + 'static> AcbsClient<T> {
    /// Create a client with custom implementations.
    pub fn with_components(
        config: AcbsConfig,
        transport: Arc<T>,
        token_provider: Arc<dyn TokenProvider>,
    ) -> Self {
        let submitter = Arc::new(DefaultBundleSubmitter::new(
            config.clone(),
            transport.clone(),
        ));
        Self {
            config,
            transport,
            token_provider,
            submitter,
        }
    }

    /// Replace the bundle submitter.
    pub fn with_submitter(mut self, submitter: Arc<dyn BundleSubmitter>) -> Self {
        self.submitter = submitter;
        self
    }

    pub fn config(&self) -> &AcbsConfig {
        &self.config
    }

    /// Get a valid ID token for backend calls.
    pub async fn get_valid_token(&self) -> AcbsResult<String> {
        Ok(self.token_provider.get_valid_token().await?)
    }

    /// Submit a bundle, classifying "not found" by the bundle's own resource.
    pub async fn submit_bundle(
        &self,
        request: &BundleInformationRequest,
    ) -> AcbsResult<BundleOutcome> {
        self.submit_bundle_for(request, request.resource_kind())
            .await
    }

    /// Submit a bundle, classifying "not found" by `resource`.
    pub async fn submit_bundle_for(
        &self,
        request: &BundleInformationRequest,
        resource: ResourceKind,
    ) -> AcbsResult<BundleOutcome> {
        if request.bundle_messages.is_empty() {
            return Err(AcbsError::bad_request(EMPTY_BUNDLE_MESSAGE));
        }

        let token = self.get_valid_token().await?;
        self.submitter
            .submit(request, &token, resource.not_found_phrases())
            .await
    }

    /// Read a resource.
    ///
    /// A `null` body means the resource does not exist; a body that is not a
    /// JSON document is an unexpected response.
    #[instrument(skip(self))]
    pub async fn get<R: DeserializeOwned>(
        &self,
        path: &str,
        resource: ResourceKind,
    ) -> AcbsResult<R> {
        let phrases = resource.not_found_phrases();
        let request = HttpRequest::get(self.config.url_for(path).as_str());
        let response = self.send(request, phrases).await?;

        match BackendBody::parse(&response.body) {
            BackendBody::Structured(value) => serde_json::from_value(value).map_err(|e| {
                debug!(error = %e, "Backend response did not match the expected shape");
                AcbsError::internal(UNEXPECTED_RESPONSE_MESSAGE)
            }),
            _ => Err(classify(response.status, &response.body, phrases)),
        }
    }

    /// Create a resource, returning the identifier from `Location` if present.
    #[instrument(skip(self, body))]
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        resource: ResourceKind,
    ) -> AcbsResult<Option<String>> {
        let request = HttpRequest::post(self.config.url_for(path).as_str())
            .json(body)
            .map_err(|e| AcbsError::internal(e.to_string()))?;
        let response = self
            .send(request, resource.not_found_phrases())
            .await?;

        Ok(response
            .header("location")
            .and_then(|location| last_path_segment(&self.config.base_url, location)))
    }

    /// Replace a resource.
    #[instrument(skip(self, body))]
    pub async fn put<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        resource: ResourceKind,
    ) -> AcbsResult<()> {
        let request = HttpRequest::put(self.config.url_for(path).as_str())
            .json(body)
            .map_err(|e| AcbsError::internal(e.to_string()))?;
        self.send(request, resource.not_found_phrases()).await?;
        Ok(())
    }

    async fn send(&self, request: HttpRequest, phrases: &[&str]) -> AcbsResult<HttpResponse> {
        let token = self.get_valid_token().await?;
        let request = request.bearer(&token);

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| classify_failure(&BackendFailure::Transport(e), phrases))?;

        if response.status == 401 {
            debug!("Backend rejected the ID token, discarding cached token");
            self.token_provider.invalidate();
        }

        if !response.is_success() {
            return Err(classify(response.status, &response.body, phrases));
        }

        Ok(response)
    }
}

/// Create a client from environment variables.
pub fn acbs_client() -> Result<AcbsClient, ConfigurationError> {
    AcbsClient::from_env()
}
