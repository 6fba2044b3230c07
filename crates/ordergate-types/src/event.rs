//! Structured gate events handed to the observability sink.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stage of the admission pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gate {
    Throttle,
    Authenticate,
    Validate,
    Dedup,
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Throttle => write!(f, "THROTTLE"),
            Self::Authenticate => write!(f, "AUTHENTICATE"),
            Self::Validate => write!(f, "VALIDATE"),
            Self::Dedup => write!(f, "DEDUP"),
        }
    }
}

/// What a gate decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateVerdict {
    Pass,
    Reject,
    /// The gate could not reach a decision.
    Error,
}

impl fmt::Display for GateVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Reject => write!(f, "REJECT"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Emitted once per gate evaluated. Never carries the secret or payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateEvent {
    pub gate: Gate,
    pub outcome: GateVerdict,
    pub user_id: String,
    pub client_address: String,
    pub at: DateTime<Utc>,
}
