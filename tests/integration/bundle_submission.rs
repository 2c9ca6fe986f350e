//! Integration tests for bundle submission

use super::*;
use acbs_integration::{
    AcbsError, BundleInformationRequest, BundleMessage, FacilityFeeAmountTransaction,
    LenderType, LoanAdvanceTransaction, ResourceKind, TransactionType,
};
use chrono::NaiveDate;
use tokio_test::assert_ok;
use wiremock::matchers::body_partial_json;

fn loan_advance_bundle() -> BundleInformationRequest {
    BundleInformationRequest::new(vec![BundleMessage::LoanAdvanceTransaction(
        LoanAdvanceTransaction {
            loan_identifier: "0000000001".to_string(),
            transaction_type: TransactionType {
                type_code: "2000".to_string(),
            },
            effective_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            loan_advance_amount: 250_000.0,
            additional: serde_json::Map::new(),
        },
    )])
}

fn fee_bundle() -> BundleInformationRequest {
    BundleInformationRequest::new(vec![BundleMessage::FacilityFeeAmountTransaction(
        FacilityFeeAmountTransaction {
            facility_identifier: "0030000321".to_string(),
            lender_type: LenderType {
                lender_type_code: "100".to_string(),
            },
            segment_identifier: "1".to_string(),
            effective_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            fee_amount: 1250.0,
            additional: serde_json::Map::new(),
        },
    )])
}

#[tokio::test]
async fn test_bundle_identifier_from_location() {
    let mock_server = setup_mock_server().await;
    mount_handshake(&mock_server, "abc", 1).await;

    Mock::given(method("POST"))
        .and(path("/api/BundleInformation"))
        .and(header("authorization", "Bearer abc"))
        .and(body_partial_json(json!({
            "PortfolioIdentifier": "E1",
            "InitialBundleStatusCode": 3,
            "InitiatingUserName": "APIUKEF",
            "UseAPIUserIndicator": false,
            "BundleMessageList": [{
                "$type": "LoanAdvanceTransaction",
                "LoanIdentifier": "0000000001",
                "EffectiveDate": "2024-03-01T00:00:00Z"
            }]
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("location", "/api/BundleInformation/999"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client(&mock_server);
    let outcome = assert_ok!(client.submit_bundle(&loan_advance_bundle()).await);

    assert_eq!(outcome.bundle_identifier, "999");
    assert_eq!(outcome.warning_message, None);
}

#[tokio::test]
async fn test_servicing_queue_and_processing_warning() {
    let mock_server = setup_mock_server().await;
    mount_handshake(&mock_server, "abc", 1).await;

    Mock::given(method("POST"))
        .and(path("/api/BundleInformation"))
        .and(query_param("servicingQueueIdentifier", "DCIS"))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("processing-warning", "Fee amount rounded")
                .set_body_json(json!({ "BundleIdentifier": "0000001234" })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client(&mock_server);
    let outcome = client
        .submit_bundle(&fee_bundle().with_servicing_queue("DCIS"))
        .await
        .unwrap();

    assert_eq!(outcome.bundle_identifier, "0000001234");
    assert_eq!(outcome.warning_message.as_deref(), Some("Fee amount rounded"));
}

#[tokio::test]
async fn test_loan_not_found_message_is_not_found() {
    let mock_server = setup_mock_server().await;
    mount_handshake(&mock_server, "abc", 1).await;

    Mock::given(method("POST"))
        .and(path("/api/BundleInformation"))
        .respond_with(ResponseTemplate::new(400).set_body_string(
            "Loan does not exist or user does not have access to it: '0000000001'",
        ))
        .mount(&mock_server)
        .await;

    let client = client(&mock_server);
    let error = client
        .submit_bundle(&loan_advance_bundle())
        .await
        .unwrap_err();

    assert!(error.is_not_found(), "unexpected error: {:?}", error);
    assert_eq!(error.status_code(), 404);
}

#[tokio::test]
async fn test_other_bad_request_keeps_detail() {
    let mock_server = setup_mock_server().await;
    mount_handshake(&mock_server, "abc", 1).await;

    Mock::given(method("POST"))
        .and(path("/api/BundleInformation"))
        .respond_with(
            ResponseTemplate::new(400).set_body_string("The field EffectiveDate is invalid."),
        )
        .mount(&mock_server)
        .await;

    let client = client(&mock_server);
    match client.submit_bundle(&loan_advance_bundle()).await {
        Err(AcbsError::BadRequest { detail }) => {
            assert_eq!(detail, "The field EffectiveDate is invalid.")
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_backend_timeout_is_internal_server_error() {
    let mock_server = setup_mock_server().await;
    mount_handshake(&mock_server, "abc", 1).await;

    Mock::given(method("POST"))
        .and(path("/api/BundleInformation"))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("location", "/api/BundleInformation/1")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let client = client(&mock_server);
    let error = client
        .submit_bundle(&loan_advance_bundle())
        .await
        .unwrap_err();

    assert!(matches!(error, AcbsError::InternalServerError { .. }));
    assert_eq!(error.public_message(), "Internal server error");
}

#[tokio::test]
async fn test_empty_bundle_makes_no_requests() {
    let mock_server = setup_mock_server().await;

    let client = client(&mock_server);
    let error = client
        .submit_bundle(&BundleInformationRequest::new(Vec::new()))
        .await
        .unwrap_err();

    assert!(matches!(error, AcbsError::BadRequest { .. }));
    let received = mock_server.received_requests().await.unwrap_or_default();
    assert!(received.is_empty());
}

#[tokio::test]
async fn test_get_null_resource_is_not_found() {
    let mock_server = setup_mock_server().await;
    mount_handshake(&mock_server, "abc", 1).await;

    Mock::given(method("GET"))
        .and(path("/api/Portfolio/E1/Deal/0020000001"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&mock_server)
        .await;

    let client = client(&mock_server);
    let result: Result<serde_json::Value, _> = client
        .get("Portfolio/E1/Deal/0020000001", ResourceKind::Deal)
        .await;

    assert!(matches!(result, Err(AcbsError::NotFound { .. })));
}
