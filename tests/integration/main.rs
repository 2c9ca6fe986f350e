//! Integration tests using WireMock
//!
//! These tests run the identity provider handshake and bundle submission
//! against a mock HTTP server through the reqwest transport.

mod authentication;
mod bundle_submission;

use std::time::Duration;

use acbs_integration::{acbs_auth_config, acbs_config, AcbsAuthConfig, AcbsClient, AcbsConfig};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const LOGIN_NAME: &str = "svc-gateway";
pub const PASSWORD: &str = "test-password";
pub const API_KEY: &str = "test-api-key";
pub const CLIENT_ID: &str = "test-client";

/// Helper to start a mock server
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Identity provider configuration pointing at `/auth` on the mock server.
pub fn auth_config(server: &MockServer) -> AcbsAuthConfig {
    acbs_auth_config()
        .base_url(format!("{}/auth", server.uri()))
        .login_name(LOGIN_NAME)
        .password(PASSWORD)
        .api_key(API_KEY)
        .client_id(CLIENT_ID)
        .id_token_cache_ttl(Duration::from_secs(60))
        .timeout(Duration::from_secs(2))
        .build()
        .expect("valid auth config")
}

/// Backend configuration pointing at `/api` on the mock server.
pub fn backend_config(server: &MockServer) -> AcbsConfig {
    acbs_config()
        .base_url(format!("{}/api", server.uri()))
        .timeout(Duration::from_millis(500))
        .build()
        .expect("valid backend config")
}

pub fn client(server: &MockServer) -> AcbsClient {
    AcbsClient::new(backend_config(server), auth_config(server)).expect("client")
}

/// Mount both handshake endpoints, each expected to be hit `times` times.
pub async fn mount_handshake(server: &MockServer, id_token: &str, times: u64) {
    Mock::given(method("POST"))
        .and(path("/auth/sessions"))
        .and(header("x-api-key", API_KEY))
        .respond_with(
            ResponseTemplate::new(201)
                .append_header("set-cookie", "AWSALB=balancer; Path=/")
                .append_header("set-cookie", "JSESSIONID=1; Path=/auth; HttpOnly"),
        )
        .expect(times)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/auth/idptoken/openid-connect"))
        .and(query_param("client_id", CLIENT_ID))
        .and(header("cookie", "JSESSIONID=1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id_token": id_token })))
        .expect(times)
        .mount(server)
        .await;
}
