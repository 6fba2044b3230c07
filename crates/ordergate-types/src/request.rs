//! The inbound request as seen by the pipeline.
//!
//! A [`Request`] is built once at ingress, read-only through every gate,
//! and dropped once its outcome is produced. It is never persisted.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::Payload;

/// A presented or stored credential secret.
///
/// Compared as an opaque token. `Debug` and `Display` are redacted so the
/// value cannot leak into logs or gate events.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Exact-match comparison against another secret.
    #[must_use]
    pub fn matches(&self, other: &Secret) -> bool {
        self.0 == other.0
    }

    /// Raw value. Only credential stores should need this.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Secret {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Secret {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// An order submission entering the pipeline.
#[derive(Debug, Clone)]
pub struct Request {
    pub user_id: String,
    pub secret: Secret,
    /// Used only as the throttle key.
    pub client_address: String,
    pub payload: Payload,
    /// Assigned at ingress from the injected clock, never client-supplied.
    pub submitted_at: DateTime<Utc>,
}

impl Request {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        secret: impl Into<Secret>,
        client_address: impl Into<String>,
        payload: Payload,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            secret: secret.into(),
            client_address: client_address.into(),
            payload,
            submitted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_is_redacted() {
        let s = Secret::new("password123");
        assert_eq!(format!("{s}"), "***");
        assert_eq!(format!("{s:?}"), "Secret(***)");
        assert_eq!(s.expose(), "password123");
    }

    #[test]
    fn request_debug_never_shows_secret() {
        let req = Request::new("user1", "hunter2", "10.0.0.1", Payload::new(), Utc::now());
        let dbg = format!("{req:?}");
        assert!(!dbg.contains("hunter2"), "secret leaked: {dbg}");
        assert!(dbg.contains("user1"));
    }

    #[test]
    fn secret_matching_is_exact() {
        let stored = Secret::new("abc");
        assert!(stored.matches(&Secret::new("abc")));
        assert!(!stored.matches(&Secret::new("abc ")));
        assert!(!stored.matches(&Secret::new("ABC")));
    }
}
