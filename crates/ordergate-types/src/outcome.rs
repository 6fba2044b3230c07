//! Terminal pipeline outcomes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Fingerprint, OrderId};

/// Confirmation returned for an accepted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub order_id: OrderId,
    pub product_id: String,
    pub quantity: i64,
    pub fingerprint: Fingerprint,
}

impl fmt::Display for Confirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Order {} processed successfully. Product: {}, Quantity: {}",
            self.order_id, self.product_id, self.quantity
        )
    }
}

/// Exactly one of these is produced per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "confirmation", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Accepted(Confirmation),
    /// Too many recent failures from the client address. Retry after the window.
    RejectedThrottled,
    RejectedUnauthenticated,
    RejectedInvalidData,
    /// Same logical order already admitted. Not a failure.
    RejectedDuplicate,
    /// Gate evaluation failed unexpectedly. Never defaults to acceptance.
    InternalError,
}

impl Outcome {
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    #[must_use]
    pub fn confirmation(&self) -> Option<&Confirmation> {
        match self {
            Self::Accepted(c) => Some(c),
            _ => None,
        }
    }

    /// Short stable label, used in gate events and logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Accepted(_) => "ACCEPTED",
            Self::RejectedThrottled => "REJECTED_THROTTLED",
            Self::RejectedUnauthenticated => "REJECTED_UNAUTHENTICATED",
            Self::RejectedInvalidData => "REJECTED_INVALID_DATA",
            Self::RejectedDuplicate => "REJECTED_DUPLICATE",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted(c) => write!(f, "{c}"),
            Self::RejectedThrottled => {
                write!(f, "Too many failed attempts. Address temporarily blocked")
            }
            Self::RejectedUnauthenticated => write!(f, "Invalid credentials"),
            Self::RejectedInvalidData => write!(f, "Order data invalid or incomplete"),
            Self::RejectedDuplicate => write!(f, "Order already submitted"),
            Self::InternalError => write!(f, "Internal error"),
        }
    }
}
