//! Bundle Submitter
//!
//! Posts bundle information to the backend and interprets the outcome.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::core::{HttpRequest, HttpResponse, HttpTransport};
use crate::error::{classify, classify_failure, AcbsError, AcbsResult, BackendFailure};
use crate::types::{AcbsConfig, BundleInformationRequest, BundleOutcome};

/// Path of the bundle information resource below the backend base URL.
pub const BUNDLE_INFORMATION_PATH: &str = "BundleInformation";
/// Query parameter carrying the servicing queue.
pub const SERVICING_QUEUE_PARAMETER: &str = "servicingQueueIdentifier";
/// Response header carrying a non-fatal processing warning.
pub const PROCESSING_WARNING_HEADER: &str = "processing-warning";
/// Body field carrying the bundle identifier when `Location` is absent.
pub const BUNDLE_IDENTIFIER_FIELD: &str = "BundleIdentifier";

pub(crate) const EMPTY_BUNDLE_MESSAGE: &str = "Bundle must contain at least one message";

/// Bundle submission interface.
#[async_trait]
pub trait BundleSubmitter: Send + Sync {
    /// Submit a bundle with a valid ID token.
    ///
    /// `not_found_phrases` are the backend messages that mean the targeted
    /// resource does not exist.
    async fn submit(
        &self,
        request: &BundleInformationRequest,
        token: &str,
        not_found_phrases: &[&str],
    ) -> AcbsResult<BundleOutcome>;
}

/// Bundle submitter sending requests through an HTTP transport.
pub struct DefaultBundleSubmitter<T: HttpTransport> {
    config: AcbsConfig,
    transport: Arc<T>,
}

impl<T: HttpTransport> DefaultBundleSubmitter<T> {
    pub fn new(config: AcbsConfig, transport: Arc<T>) -> Self {
        Self { config, transport }
    }

    fn submission_url(&self, request: &BundleInformationRequest) -> String {
        let mut url = self.config.url_for(BUNDLE_INFORMATION_PATH);
        if let Some(queue) = &request.servicing_queue_identifier {
            url.query_pairs_mut()
                .append_pair(SERVICING_QUEUE_PARAMETER, queue);
        }
        url.into()
    }
}

#[async_trait]
impl<T: HttpTransport> BundleSubmitter for DefaultBundleSubmitter<T> {
    #[instrument(
        skip(self, request, token, not_found_phrases),
        fields(messages = request.bundle_messages.len())
    )]
    async fn submit(
        &self,
        request: &BundleInformationRequest,
        token: &str,
        not_found_phrases: &[&str],
    ) -> AcbsResult<BundleOutcome> {
        if request.bundle_messages.is_empty() {
            return Err(AcbsError::bad_request(EMPTY_BUNDLE_MESSAGE));
        }

        if !request.is_homogeneous() {
            warn!(
                message_types = ?request.message_types(),
                "Bundle mixes message types"
            );
        }

        let http_request = HttpRequest::post(self.submission_url(request))
            .bearer(token)
            .json(request)
            .map_err(|e| AcbsError::internal(e.to_string()))?;

        let response = match self.transport.send(http_request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Bundle submission failed in transport");
                return Err(classify_failure(
                    &BackendFailure::Transport(e),
                    not_found_phrases,
                ));
            }
        };

        if !response.is_success() {
            debug!(status = response.status, "Bundle rejected by backend");
            return Err(classify(response.status, &response.body, not_found_phrases));
        }

        let warning_message = response
            .header(PROCESSING_WARNING_HEADER)
            .map(str::to_string);
        if let Some(warning) = &warning_message {
            warn!(warning = %warning, "Backend reported a processing warning");
        }

        let bundle_identifier = bundle_identifier(&self.config.base_url, &response).ok_or_else(|| {
            AcbsError::internal("backend did not return a bundle identifier")
        })?;
        debug!(bundle_identifier = %bundle_identifier, "Bundle accepted");

        Ok(BundleOutcome {
            bundle_identifier,
            warning_message,
        })
    }
}

/// Identifier from the `Location` header, else from the response body.
pub(crate) fn bundle_identifier(base: &Url, response: &HttpResponse) -> Option<String> {
    response
        .header("location")
        .and_then(|location| last_path_segment(base, location))
        .or_else(|| body_identifier(&response.body))
}

/// Last non-empty path segment of a `Location` value resolved against `base`.
pub(crate) fn last_path_segment(base: &Url, location: &str) -> Option<String> {
    let location = location.trim();
    if location.is_empty() {
        return None;
    }

    let resolved = base.join(location).ok()?;
    resolved
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
}

fn body_identifier(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get(BUNDLE_IDENTIFIER_FIELD)? {
        Value::String(id) if !id.trim().is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Mock bundle submitter for testing.
#[derive(Default)]
pub struct MockBundleSubmitter {
    results: Mutex<VecDeque<AcbsResult<BundleOutcome>>>,
    submissions: Mutex<Vec<(BundleInformationRequest, String)>>,
}

impl MockBundleSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the outcome of the next submission.
    pub fn queue_result(&self, result: AcbsResult<BundleOutcome>) -> &Self {
        self.results.lock().push_back(result);
        self
    }

    /// Submitted requests with the token they carried.
    pub fn get_submissions(&self) -> Vec<(BundleInformationRequest, String)> {
        self.submissions.lock().clone()
    }
}

#[async_trait]
impl BundleSubmitter for MockBundleSubmitter {
    async fn submit(
        &self,
        request: &BundleInformationRequest,
        token: &str,
        _not_found_phrases: &[&str],
    ) -> AcbsResult<BundleOutcome> {
        self.submissions
            .lock()
            .push((request.clone(), token.to_string()));

        let queued = self.results.lock().pop_front();
        queued.unwrap_or_else(|| Err(AcbsError::internal("No mock bundle outcome available")))
    }
}
