//! Request fingerprint — content-addressed idempotency key.
//!
//! The digest commits to:
//! - a fixed domain separator
//! - the user identifier
//! - the number of payload entries
//! - each `(key, type tag, value)` in ascending key order
//!
//! Every variable-length field is length-prefixed, so no two distinct
//! `(user, payload)` pairs share an encoding (unlike plain string
//! concatenation, where `("ab", "c")` and `("a", "bc")` collide). Key order
//! comes from the sanitized payload's sorted map, never from hash-map
//! iteration, so insertion order cannot change the result.

use ordergate_types::constants::FINGERPRINT_DOMAIN;
use ordergate_types::{Fingerprint, OrdergateError, PayloadValue, Result, SanitizedPayload};
use sha2::{Digest, Sha256};

const TAG_STR: u8 = 0;
const TAG_INT: u8 = 1;
const TAG_FLOAT: u8 = 2;

/// Compute the SHA-256 fingerprint of `(user_id, payload)`.
///
/// # Errors
/// [`OrdergateError::NonCanonicalValue`] for a NaN float, which has no
/// single canonical bit pattern.
pub fn compute(user_id: &str, payload: &SanitizedPayload) -> Result<Fingerprint> {
    let mut hasher = Sha256::new();
    hasher.update(FINGERPRINT_DOMAIN);
    update_bytes(&mut hasher, user_id.as_bytes());
    hasher.update((payload.len() as u64).to_le_bytes());

    for (key, value) in payload.iter() {
        update_bytes(&mut hasher, key.as_bytes());
        match value {
            PayloadValue::Str(s) => {
                hasher.update([TAG_STR]);
                update_bytes(&mut hasher, s.as_bytes());
            }
            PayloadValue::Int(v) => {
                hasher.update([TAG_INT]);
                hasher.update(v.to_le_bytes());
            }
            PayloadValue::Float(f) => {
                if f.is_nan() {
                    return Err(OrdergateError::NonCanonicalValue {
                        key: key.clone(),
                        reason: "NaN has no canonical encoding".into(),
                    });
                }
                // -0.0 == 0.0, so they must hash alike.
                let f = if *f == 0.0 { 0.0_f64 } else { *f };
                hasher.update([TAG_FLOAT]);
                hasher.update(f.to_bits().to_le_bytes());
            }
        }
    }

    let result = hasher.finalize();
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&result);
    Ok(Fingerprint(digest))
}

fn update_bytes(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

#[cfg(test)]
mod tests {
    use ordergate_types::constants::{FIELD_PRODUCT_ID, FIELD_QUANTITY};
    use ordergate_types::{Payload, payload};
    use rand::seq::SliceRandom;

    use super::*;
    use crate::validator::validate;

    fn sanitized(entries: Vec<(&str, PayloadValue)>) -> SanitizedPayload {
        validate(&payload(entries)).unwrap()
    }

    fn base_entries() -> Vec<(&'static str, PayloadValue)> {
        vec![
            (FIELD_PRODUCT_ID, PayloadValue::from("PROD123")),
            (FIELD_QUANTITY, PayloadValue::Int(2)),
            ("note", PayloadValue::from("gift")),
            ("price", PayloadValue::Float(19.99)),
            ("priority", PayloadValue::Int(7)),
        ]
    }

    #[test]
    fn deterministic() {
        let p = sanitized(base_entries());
        assert_eq!(compute("user1", &p).unwrap(), compute("user1", &p).unwrap());
    }

    #[test]
    fn stable_across_processes() {
        // Pinned so that any encoding change is a deliberate, visible break.
        let p = sanitized(vec![
            (FIELD_PRODUCT_ID, PayloadValue::from("PROD123")),
            (FIELD_QUANTITY, PayloadValue::Int(2)),
        ]);
        assert_eq!(
            compute("user1", &p).unwrap().to_hex(),
            "8a66b6bb7950033cdadefb9f7c812bf26cfc8119c435dbdb966285acbf52c182"
        );
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let expected = compute("user1", &sanitized(base_entries())).unwrap();
        let mut rng = rand::thread_rng();
        for _ in 0..32 {
            let mut entries = base_entries();
            entries.shuffle(&mut rng);
            let mut raw = Payload::with_capacity(entries.len());
            for (k, v) in entries {
                raw.insert(k.to_string(), v);
            }
            assert_eq!(compute("user1", &validate(&raw).unwrap()).unwrap(), expected);
        }
    }

    #[test]
    fn whitespace_variants_collide() {
        let a = sanitized(vec![
            (FIELD_PRODUCT_ID, PayloadValue::from("P1 ")),
            (FIELD_QUANTITY, PayloadValue::Int(2)),
        ]);
        let b = sanitized(vec![
            (FIELD_PRODUCT_ID, PayloadValue::from("P1")),
            (FIELD_QUANTITY, PayloadValue::Int(2)),
        ]);
        assert_eq!(compute("user1", &a).unwrap(), compute("user1", &b).unwrap());
    }

    #[test]
    fn user_is_part_of_key() {
        let p = sanitized(base_entries());
        assert_ne!(compute("user1", &p).unwrap(), compute("admin", &p).unwrap());
    }

    #[test]
    fn no_concatenation_ambiguity() {
        // "user1" + "1..." must not alias "user11" + "...".
        let a = sanitized(vec![
            (FIELD_PRODUCT_ID, PayloadValue::from("1P")),
            (FIELD_QUANTITY, PayloadValue::Int(2)),
        ]);
        let b = sanitized(vec![
            (FIELD_PRODUCT_ID, PayloadValue::from("P")),
            (FIELD_QUANTITY, PayloadValue::Int(2)),
        ]);
        assert_ne!(compute("user1", &a).unwrap(), compute("user11", &b).unwrap());
    }

    #[test]
    fn value_type_is_part_of_key() {
        let mut a = base_entries();
        a.push(("ref", PayloadValue::Int(5)));
        let mut b = base_entries();
        b.push(("ref", PayloadValue::from("5")));
        assert_ne!(
            compute("user1", &sanitized(a)).unwrap(),
            compute("user1", &sanitized(b)).unwrap()
        );
    }

    #[test]
    fn negative_zero_matches_zero() {
        let mut a = base_entries();
        a.push(("discount", PayloadValue::Float(0.0)));
        let mut b = base_entries();
        b.push(("discount", PayloadValue::Float(-0.0)));
        assert_eq!(
            compute("user1", &sanitized(a)).unwrap(),
            compute("user1", &sanitized(b)).unwrap()
        );
    }

    #[test]
    fn nan_is_rejected() {
        let mut entries = base_entries();
        entries.push(("discount", PayloadValue::Float(f64::NAN)));
        let err = compute("user1", &sanitized(entries)).unwrap_err();
        assert!(matches!(err, OrdergateError::NonCanonicalValue { ref key, .. } if key == "discount"));
    }
}
