//! Error types for the OrderGate admission pipeline.
//!
//! All errors use the `OG_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by gate:
//! - 1xx: Throttle errors
//! - 2xx: Authentication errors
//! - 3xx: Validation errors
//! - 4xx: Dedup / fingerprint errors
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{Fingerprint, Outcome};

/// Central error enum for all OrderGate operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrdergateError {
    // =================================================================
    // Throttle Errors (1xx)
    // =================================================================
    /// Too many recent failed attempts from this client address.
    #[error("OG_ERR_100: Throttled: {failures} failed attempts from {client_address} in {window_secs}s window")]
    Throttled {
        client_address: String,
        failures: usize,
        window_secs: u64,
    },

    // =================================================================
    // Authentication Errors (2xx)
    // =================================================================
    /// Unknown user or secret mismatch. Deliberately does not say which.
    #[error("OG_ERR_200: Authentication failed for user {user_id}")]
    Unauthenticated { user_id: String },

    /// The injected credential store could not answer the lookup.
    #[error("OG_ERR_201: Credential store error: {0}")]
    CredentialStore(String),

    // =================================================================
    // Validation Errors (3xx)
    // =================================================================
    /// A required payload field is absent.
    #[error("OG_ERR_300: Missing required field: {field}")]
    MissingField { field: String },

    /// A required payload field has the wrong dynamic type.
    #[error("OG_ERR_301: Field {field} has wrong type, expected {expected}, got {found}")]
    WrongType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A required payload field has an unacceptable value.
    #[error("OG_ERR_302: Field {field} out of range: {reason}")]
    OutOfRange { field: String, reason: String },

    // =================================================================
    // Dedup Errors (4xx)
    // =================================================================
    /// The fingerprint was already admitted.
    #[error("OG_ERR_400: Duplicate submission: {0}")]
    Duplicate(Fingerprint),

    /// A payload value has no canonical encoding (e.g. NaN).
    #[error("OG_ERR_401: Cannot canonicalize value for key {key}: {reason}")]
    NonCanonicalValue { key: String, reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("OG_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Configuration error (invalid config, out-of-range settings).
    #[error("OG_ERR_901: Configuration error: {0}")]
    Configuration(String),

    /// Serialization / deserialization error.
    #[error("OG_ERR_902: Serialization error: {0}")]
    Serialization(String),
}

impl OrdergateError {
    /// Collapse this error into the outward [`Outcome`] the caller sees.
    ///
    /// The three validation variants share one outward kind; anything that
    /// is not a caller-attributable rejection becomes an internal error.
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::Throttled { .. } => Outcome::RejectedThrottled,
            Self::Unauthenticated { .. } => Outcome::RejectedUnauthenticated,
            Self::MissingField { .. } | Self::WrongType { .. } | Self::OutOfRange { .. } => {
                Outcome::RejectedInvalidData
            }
            Self::Duplicate(_) => Outcome::RejectedDuplicate,
            Self::CredentialStore(_)
            | Self::NonCanonicalValue { .. }
            | Self::Internal(_)
            | Self::Configuration(_)
            | Self::Serialization(_) => Outcome::InternalError,
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, OrdergateError>;

impl From<serde_json::Error> for OrdergateError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
