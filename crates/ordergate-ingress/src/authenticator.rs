//! Authentication gate: exact-match credential check against the injected store.

use std::sync::Arc;

use ordergate_types::{CredentialStore, Result, Secret};

/// Checks presented secrets against a shared, externally owned [`CredentialStore`].
#[derive(Clone)]
pub struct Authenticator {
    store: Arc<dyn CredentialStore>,
}

impl Authenticator {
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// `Ok(true)` iff the user exists and the stored secret equals the
    /// presented one. Unknown user and wrong secret are indistinguishable.
    ///
    /// # Errors
    /// Propagates a failure of the store itself, which is not a
    /// credential mismatch and must not count as a failed attempt.
    pub fn authenticate(&self, user_id: &str, presented: &Secret) -> Result<bool> {
        let ok = self
            .store
            .lookup(user_id)?
            .is_some_and(|expected| expected.matches(presented));
        if ok {
            tracing::debug!(user_id, "authentication succeeded");
        } else {
            tracing::warn!(user_id, "authentication failed");
        }
        Ok(ok)
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use ordergate_types::{InMemoryCredentialStore, OrdergateError};

    use super::*;

    fn authenticator() -> Authenticator {
        Authenticator::new(Arc::new(
            InMemoryCredentialStore::new()
                .with_user("user1", "password123")
                .with_user("admin", "admin123"),
        ))
    }

    struct BrokenStore;

    impl CredentialStore for BrokenStore {
        fn lookup(&self, _user_id: &str) -> Result<Option<Secret>> {
            Err(OrdergateError::CredentialStore("connection refused".into()))
        }
    }

    #[test]
    fn correct_secret_passes() {
        let auth = authenticator();
        assert!(auth.authenticate("user1", &Secret::new("password123")).unwrap());
        assert!(auth.authenticate("admin", &Secret::new("admin123")).unwrap());
    }

    #[test]
    fn wrong_secret_fails() {
        let auth = authenticator();
        assert!(!auth.authenticate("user1", &Secret::new("wrong_password")).unwrap());
        // Secrets belong to their user only.
        assert!(!auth.authenticate("user1", &Secret::new("admin123")).unwrap());
    }

    #[test]
    fn unknown_user_fails() {
        let auth = authenticator();
        assert!(!auth.authenticate("mallory", &Secret::new("password123")).unwrap());
    }

    #[test]
    fn store_failure_propagates() {
        let auth = Authenticator::new(Arc::new(BrokenStore));
        let err = auth.authenticate("user1", &Secret::new("x")).unwrap_err();
        assert!(matches!(err, OrdergateError::CredentialStore(_)));
    }
}
