//! System-wide constants for the OrderGate admission pipeline.

/// Default sliding window for failed authentication attempts (seconds).
pub const DEFAULT_THROTTLE_WINDOW_SECS: u64 = 300;

/// Default number of failures within the window that blocks an address.
pub const DEFAULT_MAX_FAILURES: usize = 3;

/// Payload field holding the product identifier (string).
pub const FIELD_PRODUCT_ID: &str = "product_id";

/// Payload field holding the order quantity (numeric).
pub const FIELD_QUANTITY: &str = "quantity";

/// Fields every order payload must carry.
pub const REQUIRED_FIELDS: [&str; 2] = [FIELD_PRODUCT_ID, FIELD_QUANTITY];

/// Domain separator mixed into every request fingerprint.
pub const FINGERPRINT_DOMAIN: &[u8] = b"ordergate:fingerprint:v1:";
