//! Validation gate — structural checks and normalization of the order payload.
//!
//! ## Rules
//!
//! - `product_id` must be present and a string
//! - `quantity` must be present and numeric (integer or float) and strictly
//!   positive. The check runs on the value as submitted, before truncation
//! - Every string value is trimmed; `quantity` becomes its integer truncation,
//!   so `0.5` passes and is sanitized to `0`
//!
//! Only the two required fields are type/value checked. Any other entry is
//! carried through, normalized but otherwise unchecked.

use std::collections::BTreeMap;

use ordergate_types::constants::{FIELD_PRODUCT_ID, FIELD_QUANTITY, REQUIRED_FIELDS};
use ordergate_types::{OrdergateError, Payload, PayloadValue, Result, SanitizedPayload};

/// 2^63: the first float that no longer fits in an `i64` after truncation.
const I64_EXCLUSIVE_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Validate and sanitize a raw payload in one pass.
///
/// # Errors
/// [`OrdergateError::MissingField`], [`OrdergateError::WrongType`] or
/// [`OrdergateError::OutOfRange`] for the first rule violated.
pub fn validate(payload: &Payload) -> Result<SanitizedPayload> {
    for field in REQUIRED_FIELDS {
        if !payload.contains_key(field) {
            return Err(OrdergateError::MissingField {
                field: field.to_string(),
            });
        }
    }

    let product_id = match &payload[FIELD_PRODUCT_ID] {
        PayloadValue::Str(s) => s.trim().to_string(),
        other => {
            return Err(OrdergateError::WrongType {
                field: FIELD_PRODUCT_ID.to_string(),
                expected: "string",
                found: other.type_name(),
            });
        }
    };
    let quantity = coerce_quantity(&payload[FIELD_QUANTITY])?;

    let mut entries: BTreeMap<String, PayloadValue> = payload
        .iter()
        .map(|(k, v)| (k.clone(), sanitize_value(v)))
        .collect();
    entries.insert(FIELD_QUANTITY.to_string(), PayloadValue::Int(quantity));

    tracing::trace!(product_id = %product_id, quantity, fields = entries.len(), "payload sanitized");
    Ok(SanitizedPayload::from_parts(entries, product_id, quantity))
}

fn sanitize_value(value: &PayloadValue) -> PayloadValue {
    match value {
        PayloadValue::Str(s) => PayloadValue::Str(s.trim().to_string()),
        other => other.clone(),
    }
}

/// Check the numeric value and truncate it to an integer.
fn coerce_quantity(value: &PayloadValue) -> Result<i64> {
    let out_of_range = |reason: String| OrdergateError::OutOfRange {
        field: FIELD_QUANTITY.to_string(),
        reason,
    };

    match value {
        PayloadValue::Int(v) if *v > 0 => Ok(*v),
        PayloadValue::Int(v) => Err(out_of_range(format!("{v} is not > 0"))),
        PayloadValue::Float(f) => {
            if !f.is_finite() {
                return Err(out_of_range(format!("{f} is not finite")));
            }
            if *f <= 0.0 {
                return Err(out_of_range(format!("{f} is not > 0")));
            }
            let truncated = f.trunc();
            if truncated >= I64_EXCLUSIVE_BOUND {
                return Err(out_of_range(format!("{f} exceeds integer range")));
            }
            #[allow(clippy::cast_possible_truncation)]
            Ok(truncated as i64)
        }
        other @ PayloadValue::Str(_) => Err(OrdergateError::WrongType {
            field: FIELD_QUANTITY.to_string(),
            expected: "number",
            found: other.type_name(),
        }),
    }
}
