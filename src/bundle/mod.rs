//! Bundle Submission
//!
//! Every backend write (deal, facility, loan, covenant, fee) is wrapped in a
//! bundle and posted to the bundle information resource.

pub mod submitter;

pub use submitter::{
    BundleSubmitter, DefaultBundleSubmitter, MockBundleSubmitter, BUNDLE_IDENTIFIER_FIELD,
    BUNDLE_INFORMATION_PATH, PROCESSING_WARNING_HEADER, SERVICING_QUEUE_PARAMETER,
};
