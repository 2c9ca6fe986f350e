//! Error Classifier
//!
//! Maps raw backend failures onto the classified error taxonomy. The backend
//! signals a missing resource in several inconsistent ways (a `null` body with
//! status 200, or a 400 whose text mentions the resource), so callers pass
//! the phrases that mean "not found" for the resource they asked about.

use serde_json::Value;
use std::borrow::Cow;

use crate::error::{AcbsError, BackendFailure};

/// Detail recorded when a 200 response cannot be interpreted.
pub const UNEXPECTED_RESPONSE_MESSAGE: &str = "unexpected response from backend";

const DEAL_NOT_FOUND: &[&str] = &[
    "The deal not found or the user does not have access to it",
    "Deal does not exist or user does not have access to it",
];

const FACILITY_NOT_FOUND: &[&str] = &[
    "Facility does not exist or user does not have access to it",
    "The facility not found or the user does not have access to it",
];

const LOAN_NOT_FOUND: &[&str] = &["Loan does not exist or user does not have access to it"];

const BUNDLE_NOT_FOUND: &[&str] = &[
    "BundleInformation does not exist or user does not have access to it",
    "Bundle does not exist or user does not have access to it",
];

const PARTY_NOT_FOUND: &[&str] = &[
    "Party does not exist or user does not have access to it",
    "The party not found or the user does not have access to it",
];

const FACILITY_FEE_NOT_FOUND: &[&str] = &[
    "Facility does not exist or user does not have access to it",
    "Fee does not exist or user does not have access to it",
];

const FACILITY_COVENANT_NOT_FOUND: &[&str] = &[
    "Facility does not exist or user does not have access to it",
    "Covenant does not exist or user does not have access to it",
];

const FACILITY_INVESTOR_NOT_FOUND: &[&str] = &[
    "Facility does not exist or user does not have access to it",
    "Investor does not exist or user does not have access to it",
];

const FACILITY_GUARANTEE_NOT_FOUND: &[&str] = &[
    "Facility does not exist or user does not have access to it",
    "Guarantee does not exist or user does not have access to it",
];

/// Backend resource a request targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Deal,
    Facility,
    Loan,
    Bundle,
    Party,
    FacilityFee,
    FacilityCovenant,
    FacilityInvestor,
    FacilityGuarantee,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deal => "deal",
            Self::Facility => "facility",
            Self::Loan => "loan",
            Self::Bundle => "bundle",
            Self::Party => "party",
            Self::FacilityFee => "facility_fee",
            Self::FacilityCovenant => "facility_covenant",
            Self::FacilityInvestor => "facility_investor",
            Self::FacilityGuarantee => "facility_guarantee",
        }
    }

    /// Phrases the backend uses in a 400 body when this resource is absent.
    pub fn not_found_phrases(&self) -> &'static [&'static str] {
        match self {
            Self::Deal => DEAL_NOT_FOUND,
            Self::Facility => FACILITY_NOT_FOUND,
            Self::Loan => LOAN_NOT_FOUND,
            Self::Bundle => BUNDLE_NOT_FOUND,
            Self::Party => PARTY_NOT_FOUND,
            Self::FacilityFee => FACILITY_FEE_NOT_FOUND,
            Self::FacilityCovenant => FACILITY_COVENANT_NOT_FOUND,
            Self::FacilityInvestor => FACILITY_INVESTOR_NOT_FOUND,
            Self::FacilityGuarantee => FACILITY_GUARANTEE_NOT_FOUND,
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interpreted shape of a raw backend body.
#[derive(Clone, Debug, PartialEq)]
pub enum BackendBody<'a> {
    /// JSON `null`.
    Null,
    /// Plain text, or the content of a JSON string literal.
    Text(Cow<'a, str>),
    /// Any other JSON value.
    Structured(Value),
}

impl<'a> BackendBody<'a> {
    pub fn parse(raw: &'a str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Null) => Self::Null,
            Ok(Value::String(text)) => Self::Text(Cow::Owned(text)),
            Ok(value) => Self::Structured(value),
            Err(_) => Self::Text(Cow::Borrowed(raw)),
        }
    }
}

/// Classify a backend response that was not accepted as a success.
pub fn classify(status: u16, raw_body: &str, not_found_phrases: &[&str]) -> AcbsError {
    let body = BackendBody::parse(raw_body);

    match (status, body) {
        (200, BackendBody::Null) => AcbsError::not_found("backend returned null"),
        (200, _) => AcbsError::internal(UNEXPECTED_RESPONSE_MESSAGE),
        (400, BackendBody::Text(text)) => {
            if not_found_phrases
                .iter()
                .any(|phrase| text.contains(phrase))
            {
                AcbsError::not_found(text)
            } else {
                AcbsError::bad_request(text)
            }
        }
        (400, BackendBody::Null) => AcbsError::bad_request("null"),
        (400, BackendBody::Structured(value)) => AcbsError::bad_request(value.to_string()),
        (status, _) => AcbsError::internal(format!("backend responded with status {}", status)),
    }
}

/// Classify any raw failure, including transport-level ones.
pub fn classify_failure(failure: &BackendFailure, not_found_phrases: &[&str]) -> AcbsError {
    match failure {
        BackendFailure::Status { status, body } => classify(*status, body, not_found_phrases),
        BackendFailure::Transport(e) => AcbsError::internal(e.to_string()),
    }
}
