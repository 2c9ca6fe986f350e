//! Bundle Types
//!
//! The backend's transactional write envelope ("bundle information") and the
//! typed messages it carries.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ResourceKind;

/// Portfolio every bundle is posted to unless overridden.
pub const DEFAULT_PORTFOLIO_IDENTIFIER: &str = "E1";
/// Bundle status the backend assigns to newly submitted work.
pub const DEFAULT_INITIAL_BUNDLE_STATUS_CODE: u32 = 3;
/// User recorded as the initiator of API bundles.
pub const DEFAULT_INITIATING_USER_NAME: &str = "APIUKEF";

/// Bundle information request body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BundleInformationRequest {
    pub portfolio_identifier: String,
    pub initial_bundle_status_code: u32,
    pub initiating_user_name: String,
    #[serde(rename = "UseAPIUserIndicator")]
    pub use_api_user_indicator: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "acbs_date::option"
    )]
    pub posting_date: Option<NaiveDate>,
    #[serde(rename = "BundleMessageList")]
    pub bundle_messages: Vec<BundleMessage>,
    /// Sent as the `servicingQueueIdentifier` query parameter.
    #[serde(skip)]
    pub servicing_queue_identifier: Option<String>,
}

impl BundleInformationRequest {
    /// Create a request with the backend's default envelope values.
    pub fn new(bundle_messages: Vec<BundleMessage>) -> Self {
        Self {
            portfolio_identifier: DEFAULT_PORTFOLIO_IDENTIFIER.to_string(),
            initial_bundle_status_code: DEFAULT_INITIAL_BUNDLE_STATUS_CODE,
            initiating_user_name: DEFAULT_INITIATING_USER_NAME.to_string(),
            use_api_user_indicator: false,
            posting_date: None,
            bundle_messages,
            servicing_queue_identifier: None,
        }
    }

    pub fn with_portfolio(mut self, portfolio_identifier: impl Into<String>) -> Self {
        self.portfolio_identifier = portfolio_identifier.into();
        self
    }

    pub fn with_posting_date(mut self, posting_date: NaiveDate) -> Self {
        self.posting_date = Some(posting_date);
        self
    }

    pub fn with_servicing_queue(mut self, identifier: impl Into<String>) -> Self {
        self.servicing_queue_identifier = Some(identifier.into());
        self
    }

    /// Resource whose "not found" wording applies to this bundle.
    ///
    /// Derived from the first message; an empty bundle maps to facility.
    pub fn resource_kind(&self) -> ResourceKind {
        self.bundle_messages
            .first()
            .map(BundleMessage::resource_kind)
            .unwrap_or(ResourceKind::Facility)
    }

    /// True when every message shares the first message's discriminator.
    pub fn is_homogeneous(&self) -> bool {
        match self.bundle_messages.split_first() {
            Some((first, rest)) => rest
                .iter()
                .all(|message| message.message_type() == first.message_type()),
            None => true,
        }
    }

    pub fn message_types(&self) -> Vec<&'static str> {
        self.bundle_messages
            .iter()
            .map(BundleMessage::message_type)
            .collect()
    }
}

/// A single write action inside a bundle, discriminated by `$type`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum BundleMessage {
    NewLoanRequest(NewLoanRequest),
    FacilityAmountTransaction(FacilityAmountTransaction),
    FacilityCodeValueTransaction(FacilityCodeValueTransaction),
    LoanAdvanceTransaction(LoanAdvanceTransaction),
    FacilityFeeAmountTransaction(FacilityFeeAmountTransaction),
}

impl BundleMessage {
    /// Discriminator value written to `$type`.
    pub fn message_type(&self) -> &'static str {
        match self {
            Self::NewLoanRequest(_) => "NewLoanRequest",
            Self::FacilityAmountTransaction(_) => "FacilityAmountTransaction",
            Self::FacilityCodeValueTransaction(_) => "FacilityCodeValueTransaction",
            Self::LoanAdvanceTransaction(_) => "LoanAdvanceTransaction",
            Self::FacilityFeeAmountTransaction(_) => "FacilityFeeAmountTransaction",
        }
    }

    pub fn resource_kind(&self) -> ResourceKind {
        match self {
            Self::LoanAdvanceTransaction(_) => ResourceKind::Loan,
            Self::FacilityFeeAmountTransaction(_) => ResourceKind::FacilityFee,
            Self::NewLoanRequest(_)
            | Self::FacilityAmountTransaction(_)
            | Self::FacilityCodeValueTransaction(_) => ResourceKind::Facility,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Currency {
    pub currency_code: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LenderType {
    pub lender_type_code: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactionType {
    pub type_code: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FacilityTransactionCodeValue {
    pub facility_transaction_code_value_code: String,
}

/// New loan drawn on a facility.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewLoanRequest {
    pub facility_identifier: String,
    pub borrower_party_identifier: String,
    pub currency: Currency,
    pub loan_amount: f64,
    #[serde(with = "acbs_date")]
    pub effective_date: NaiveDate,
    #[serde(with = "acbs_date")]
    pub maturity_date: NaiveDate,
    /// Remaining backend attributes, sent verbatim.
    #[serde(flatten)]
    pub additional: Map<String, Value>,
}

/// Change to a facility amount.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FacilityAmountTransaction {
    pub facility_identifier: String,
    pub lender_type: LenderType,
    pub facility_transaction_type: TransactionType,
    #[serde(with = "acbs_date")]
    pub effective_date: NaiveDate,
    pub amount_amount: f64,
    #[serde(flatten)]
    pub additional: Map<String, Value>,
}

/// Change to a coded facility attribute (e.g. the facility stage).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FacilityCodeValueTransaction {
    pub facility_identifier: String,
    pub lender_type: LenderType,
    pub facility_transaction_code_value: FacilityTransactionCodeValue,
    #[serde(with = "acbs_date")]
    pub effective_date: NaiveDate,
    #[serde(flatten)]
    pub additional: Map<String, Value>,
}

/// Advance on an existing loan.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoanAdvanceTransaction {
    pub loan_identifier: String,
    pub transaction_type: TransactionType,
    #[serde(with = "acbs_date")]
    pub effective_date: NaiveDate,
    pub loan_advance_amount: f64,
    #[serde(flatten)]
    pub additional: Map<String, Value>,
}

/// Amendment of a facility fee amount. A bundle may carry several.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FacilityFeeAmountTransaction {
    pub facility_identifier: String,
    pub lender_type: LenderType,
    pub segment_identifier: String,
    #[serde(with = "acbs_date")]
    pub effective_date: NaiveDate,
    pub fee_amount: f64,
    #[serde(flatten)]
    pub additional: Map<String, Value>,
}

/// Result of a successful bundle submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BundleOutcome {
    pub bundle_identifier: String,
    /// Non-fatal warning reported by the backend.
    pub warning_message: Option<String>,
}

/// Date format used by the backend for all date attributes.
pub mod acbs_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT00:00:00Z";

    pub fn format(date: &NaiveDate) -> String {
        date.format(FORMAT).to_string()
    }

    /// Parse the date part of a backend timestamp (`YYYY-MM-DD...`).
    pub fn parse(value: &str) -> Result<NaiveDate, chrono::ParseError> {
        let date_part = value.get(..10).unwrap_or(value);
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
    }

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let value = String::deserialize(deserializer)?;
        parse(&value).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::NaiveDate;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            date: &Option<NaiveDate>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match date {
                Some(date) => serializer.serialize_str(&super::format(date)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveDate>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|value| super::parse(&value).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
