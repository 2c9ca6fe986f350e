//! Integration tests for the identity provider handshake

use super::*;
use acbs_integration::{
    AuthenticationError, MockClock, ReqwestHttpTransport, SessionAuthenticator,
};
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::body_json;

fn transport() -> Arc<ReqwestHttpTransport> {
    Arc::new(ReqwestHttpTransport::new(Duration::from_secs(2), 5).expect("transport"))
}

#[tokio::test]
async fn test_handshake_sends_credentials_and_session_cookie() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/auth/sessions"))
        .and(header("x-api-key", API_KEY))
        .and(body_json(json!({ "loginName": LOGIN_NAME, "password": PASSWORD })))
        .respond_with(ResponseTemplate::new(201).append_header(
            "set-cookie",
            "Cookie1=abc; JSESSIONID=42; Path=/x; Cookie2=def",
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/auth/idptoken/openid-connect"))
        .and(query_param("client_id", CLIENT_ID))
        .and(header("cookie", "JSESSIONID=42"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(header("x-api-key", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id_token": "abc" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let authenticator = SessionAuthenticator::new(auth_config(&mock_server), transport());

    let token = assert_ok!(authenticator.get_valid_token().await);
    assert_eq!(token, "abc");
}

#[tokio::test]
async fn test_second_call_within_ttl_uses_cache() {
    let mock_server = setup_mock_server().await;
    mount_handshake(&mock_server, "abc", 1).await;

    let authenticator = SessionAuthenticator::new(auth_config(&mock_server), transport());

    assert_eq!(authenticator.get_valid_token().await.unwrap(), "abc");
    assert_eq!(authenticator.get_valid_token().await.unwrap(), "abc");

    let received = mock_server.received_requests().await.unwrap_or_default();
    assert_eq!(received.len(), 2);
}

#[tokio::test]
async fn test_expired_token_is_fetched_again() {
    let mock_server = setup_mock_server().await;
    mount_handshake(&mock_server, "abc", 2).await;

    let clock = Arc::new(MockClock::new());
    let authenticator =
        SessionAuthenticator::with_clock(auth_config(&mock_server), transport(), clock.clone());

    assert_ok!(authenticator.get_valid_token().await);
    clock.advance(Duration::from_secs(60));
    assert_ok!(authenticator.get_valid_token().await);
}

#[tokio::test]
async fn test_concurrent_callers_trigger_one_handshake() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/auth/sessions"))
        .respond_with(
            ResponseTemplate::new(201)
                .append_header("set-cookie", "JSESSIONID=1; Path=/")
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/auth/idptoken/openid-connect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id_token": "shared" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let authenticator = SessionAuthenticator::new(auth_config(&mock_server), transport());

    let results =
        futures::future::join_all((0..5).map(|_| authenticator.get_valid_token())).await;

    for result in results {
        assert_eq!(result.unwrap(), "shared");
    }
}

#[tokio::test]
async fn test_concurrent_callers_after_expiry_trigger_one_handshake() {
    let mock_server = setup_mock_server().await;
    mount_handshake(&mock_server, "abc", 2).await;

    let clock = Arc::new(MockClock::new());
    let authenticator =
        SessionAuthenticator::with_clock(auth_config(&mock_server), transport(), clock.clone());

    assert_ok!(authenticator.get_valid_token().await);
    clock.advance(Duration::from_secs(61));

    let results =
        futures::future::join_all((0..5).map(|_| authenticator.get_valid_token())).await;

    for result in results {
        assert_eq!(result.unwrap(), "abc");
    }
    let received = mock_server.received_requests().await.unwrap_or_default();
    assert_eq!(received.len(), 4);
}

#[tokio::test]
async fn test_missing_session_cookie_message() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/auth/sessions"))
        .respond_with(ResponseTemplate::new(201).append_header("set-cookie", "Cookie1=abc"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/auth/idptoken/openid-connect"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let authenticator = SessionAuthenticator::new(auth_config(&mock_server), transport());

    let error = assert_err!(authenticator.get_valid_token().await);
    assert!(matches!(error, AuthenticationError::SessionCookieMissing));
    assert_eq!(
        error.to_string(),
        "Session cookie was not returned by the identity provider."
    );
}

#[tokio::test]
async fn test_rejected_login() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/auth/sessions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid credentials"))
        .mount(&mock_server)
        .await;

    let authenticator = SessionAuthenticator::new(auth_config(&mock_server), transport());

    let error = assert_err!(authenticator.get_valid_token().await);
    assert_eq!(
        error.to_string(),
        "Failed to create a session with the identity provider."
    );
    assert!(!error.is_retryable());
}

#[tokio::test]
async fn test_missing_id_token() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/auth/sessions"))
        .respond_with(ResponseTemplate::new(201).append_header("set-cookie", "JSESSIONID=1"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/auth/idptoken/openid-connect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "x" })))
        .mount(&mock_server)
        .await;

    let authenticator = SessionAuthenticator::new(auth_config(&mock_server), transport());

    let error = assert_err!(authenticator.get_valid_token().await);
    assert!(matches!(error, AuthenticationError::IdTokenMissing));
}

#[tokio::test]
async fn test_retry_recovers_from_unavailable_identity_provider() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/auth/sessions"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_handshake(&mock_server, "after-retry", 1).await;

    let config = acbs_auth_config()
        .base_url(format!("{}/auth", mock_server.uri()))
        .login_name(LOGIN_NAME)
        .password(PASSWORD)
        .api_key(API_KEY)
        .client_id(CLIENT_ID)
        .max_retries(2)
        .retry_delay(Duration::from_millis(10))
        .build()
        .unwrap();
    let client = AcbsClient::new(backend_config(&mock_server), config).unwrap();

    assert_eq!(client.get_valid_token().await.unwrap(), "after-retry");
}
