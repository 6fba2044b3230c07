//! Order payload model.
//!
//! A raw [`Payload`] arrives as an unordered map of dynamically-typed
//! values. After validation it becomes a [`SanitizedPayload`], whose
//! entries are kept sorted by key so every consumer sees one canonical
//! iteration order.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{FIELD_PRODUCT_ID, FIELD_QUANTITY};

/// A single payload value: string, integer, or float.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl PayloadValue {
    /// Name of the dynamic type, for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for PayloadValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for PayloadValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for PayloadValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for PayloadValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for PayloadValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for PayloadValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

/// Raw order payload as received at ingress. Iteration order is unspecified.
pub type Payload = HashMap<String, PayloadValue>;

/// Build a [`Payload`] from `(key, value)` pairs.
///
/// ```
/// use ordergate_types::{payload, PayloadValue};
/// let p = payload([
///     ("product_id", PayloadValue::from("P1")),
///     ("quantity", PayloadValue::Int(2)),
/// ]);
/// assert_eq!(p.len(), 2);
/// ```
pub fn payload<K, I>(entries: I) -> Payload
where
    K: Into<String>,
    I: IntoIterator<Item = (K, PayloadValue)>,
{
    entries.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// A validated, normalized payload.
///
/// Invariants (established by the validator, the only constructor in
/// practice): `product_id` is a trimmed string, `quantity` is the integer
/// truncation of a positive number (so `0` for inputs in `(0, 1)`), every
/// other string value is trimmed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SanitizedPayload {
    entries: BTreeMap<String, PayloadValue>,
    product_id: String,
    quantity: i64,
}

impl SanitizedPayload {
    /// Assemble from already-normalized parts.
    #[must_use]
    pub fn from_parts(
        entries: BTreeMap<String, PayloadValue>,
        product_id: String,
        quantity: i64,
    ) -> Self {
        Self {
            entries,
            product_id,
            quantity,
        }
    }

    #[must_use]
    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    #[must_use]
    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PayloadValue> {
        self.entries.get(key)
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&String, &PayloadValue)> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if the required fields are mirrored in the entry map.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.entries.get(FIELD_PRODUCT_ID).and_then(PayloadValue::as_str)
            == Some(self.product_id.as_str())
            && self.entries.get(FIELD_QUANTITY).and_then(PayloadValue::as_int)
                == Some(self.quantity)
    }
}
