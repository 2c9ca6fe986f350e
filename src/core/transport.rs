//! HTTP Transport
//!
//! HTTP client interface and implementations for ACBS requests. The transport
//! never interprets backend semantics: it returns the raw response or a
//! transport-level failure.

use async_trait::async_trait;
use parking_lot::Mutex;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crate::error::{ConfigurationError, TransportError};

/// HTTP request definition.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Request URL.
    pub url: String,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Bearer token sent as `Authorization: Bearer <token>`.
    pub bearer_token: Option<SecretString>,
    /// Request body.
    pub body: Option<String>,
    /// Per-request timeout overriding the transport default.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            bearer_token: None,
            body: None,
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_lowercase(), value.into());
        self
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.bearer_token = Some(SecretString::new(token.to_string()));
        self
    }

    /// Serialize `body` as JSON and set the content type.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, TransportError> {
        let encoded = serde_json::to_string(body).map_err(|e| TransportError::RequestFailed {
            message: format!("Failed to serialize request body: {}", e),
        })?;
        self.body = Some(encoded);
        Ok(self.header("content-type", "application/json"))
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// HTTP method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
        }
    }
}

/// HTTP response definition.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers with lowercase names, in arrival order. Repeated
    /// headers such as `set-cookie` appear once per value.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .push((name.into().to_lowercase(), value.into()));
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First value of a header, matched case-insensitively.
    pub fn header<'a>(&'a self, name: &str) -> Option<&'a str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// All values of a header, matched case-insensitively.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// HTTP transport interface (for dependency injection).
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send an HTTP request.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Default reqwest-based HTTP transport.
pub struct ReqwestHttpTransport {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl ReqwestHttpTransport {
    /// Create transport with a request timeout and redirect limit.
    ///
    /// A limit of zero disables redirect following; the 3xx response is then
    /// returned as is.
    pub fn new(timeout: Duration, max_redirects: usize) -> Result<Self, ConfigurationError> {
        let redirect_policy = if max_redirects == 0 {
            reqwest::redirect::Policy::none()
        } else {
            reqwest::redirect::Policy::limited(max_redirects)
        };

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(redirect_policy)
            .build()
            .map_err(|e| ConfigurationError::HttpClient {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            default_timeout: timeout,
        })
    }

    fn map_error(error: reqwest::Error, timeout: Duration) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout { timeout }
        } else if error.is_redirect() {
            TransportError::TooManyRedirects {
                message: error.to_string(),
            }
        } else if error.is_connect() {
            TransportError::ConnectionFailed {
                message: error.to_string(),
            }
        } else {
            TransportError::RequestFailed {
                message: error.to_string(),
            }
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestHttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let timeout = request.timeout.unwrap_or(self.default_timeout);

        let mut req_builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
            HttpMethod::Put => self.client.put(&request.url),
        };

        for (key, value) in &request.headers {
            req_builder = req_builder.header(key, value);
        }

        if let Some(token) = &request.bearer_token {
            req_builder = req_builder.bearer_auth(token.expose_secret());
        }

        if let Some(body) = request.body {
            req_builder = req_builder.body(body);
        }

        let response = req_builder
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Self::map_error(e, timeout))?;

        let status = response.status().as_u16();

        let headers = response
            .headers()
            .iter()
            .filter_map(|(key, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (key.as_str().to_lowercase(), v.to_string()))
            })
            .collect();

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout { timeout }
            } else {
                TransportError::InvalidResponse {
                    message: e.to_string(),
                }
            }
        })?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Mock HTTP transport for testing.
///
/// Responses are returned in the order they were queued.
#[derive(Default)]
pub struct MockHttpTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    request_history: Mutex<Vec<HttpRequest>>,
    latency: Mutex<Option<Duration>>,
}

impl MockHttpTransport {
    /// Create new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response to return.
    pub fn queue_response(&self, response: HttpResponse) -> &Self {
        self.responses.lock().push_back(Ok(response));
        self
    }

    /// Queue a JSON response.
    pub fn queue_json_response<T: Serialize>(&self, status: u16, body: &T) -> &Self {
        let response = HttpResponse::new(status, serde_json::to_string(body).unwrap_or_default())
            .with_header("content-type", "application/json");
        self.queue_response(response)
    }

    /// Queue a transport failure.
    pub fn queue_failure(&self, error: TransportError) -> &Self {
        self.responses.lock().push_back(Err(error));
        self
    }

    /// Delay every response, to keep requests in flight.
    pub fn set_latency(&self, latency: Duration) -> &Self {
        *self.latency.lock() = Some(latency);
        self
    }

    /// Get request history.
    pub fn get_requests(&self) -> Vec<HttpRequest> {
        self.request_history.lock().clone()
    }

    /// Get last request.
    pub fn get_last_request(&self) -> Option<HttpRequest> {
        self.request_history.lock().last().cloned()
    }

    /// Number of requests sent so far.
    pub fn request_count(&self) -> usize {
        self.request_history.lock().len()
    }
}

#[async_trait]
impl HttpTransport for MockHttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.request_history.lock().push(request);

        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let next = self.responses.lock().pop_front();
        next.unwrap_or_else(|| {
            Err(TransportError::ConnectionFailed {
                message: "No mock response available".to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_transport_is_fifo() {
        let transport = MockHttpTransport::new();
        transport
            .queue_json_response(201, &serde_json::json!({"first": true}))
            .queue_response(HttpResponse::new(400, "second"));

        let first = transport
            .send(HttpRequest::get("https://acbs.example.com/a"))
            .await
            .unwrap();
        let second = transport
            .send(HttpRequest::get("https://acbs.example.com/b"))
            .await
            .unwrap();

        assert_eq!(first.status, 201);
        assert!(first.body.contains("first"));
        assert_eq!(second.status, 400);
        assert_eq!(transport.request_count(), 2);
        assert_eq!(transport.get_requests()[1].url, "https://acbs.example.com/b");
    }

    #[tokio::test]
    async fn test_mock_transport_without_responses_fails() {
        let transport = MockHttpTransport::new();
        let result = transport
            .send(HttpRequest::get("https://acbs.example.com"))
            .await;
        assert!(matches!(
            result,
            Err(TransportError::ConnectionFailed { .. })
        ));
    }

    #[test]
    fn test_response_header_lookup() {
        let response = HttpResponse::new(201, "")
            .with_header("Set-Cookie", "a=1")
            .with_header("set-cookie", "JSESSIONID=2")
            .with_header("Location", "/BundleInformation/999");

        assert_eq!(response.header("location"), Some("/BundleInformation/999"));
        assert_eq!(
            response.header_values("SET-COOKIE").collect::<Vec<_>>(),
            vec!["a=1", "JSESSIONID=2"]
        );
        assert!(response.is_success());
    }

    #[test]
    fn test_request_builder() {
        let request = HttpRequest::post("https://acbs.example.com/BundleInformation")
            .bearer("abc")
            .json(&serde_json::json!({"PortfolioIdentifier": "E1"}))
            .unwrap();

        assert_eq!(request.method.as_str(), "POST");
        assert_eq!(
            request.headers.get("content-type").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(
            request.bearer_token.as_ref().map(|t| t.expose_secret().as_str()),
            Some("abc")
        );
        assert_eq!(request.body.as_deref(), Some(r#"{"PortfolioIdentifier":"E1"}"#));
    }
}
