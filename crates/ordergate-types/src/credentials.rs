//! Credential lookup capability.
//!
//! The pipeline only reads credentials and never assumes exclusive access.
//! Production deployments inject a store that hashes at rest and compares
//! in constant time; [`InMemoryCredentialStore`] is the plain-token
//! reference implementation.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::{Result, Secret};

/// Maps a user identifier to its expected secret.
pub trait CredentialStore: Send + Sync {
    /// `Ok(None)` for an unknown user; `Err` only if the store itself failed.
    fn lookup(&self, user_id: &str) -> Result<Option<Secret>>;
}

/// Read-mostly in-memory credential table.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    users: RwLock<HashMap<String, Secret>>,
}

impl InMemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with_user(self, user_id: impl Into<String>, secret: impl Into<Secret>) -> Self {
        self.upsert(user_id, secret);
        self
    }

    /// Insert or replace a user's secret.
    pub fn upsert(&self, user_id: impl Into<String>, secret: impl Into<Secret>) {
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id.into(), secret.into());
    }

    /// Remove a user. Returns `true` if the user existed.
    pub fn remove(&self, user_id: &str) -> bool {
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(user_id)
            .is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<HashMap<String, String>> for InMemoryCredentialStore {
    fn from(users: HashMap<String, String>) -> Self {
        Self {
            users: RwLock::new(users.into_iter().map(|(u, s)| (u, Secret::from(s))).collect()),
        }
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn lookup(&self, user_id: &str) -> Result<Option<Secret>> {
        Ok(self
            .users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_known_and_unknown() {
        let store = InMemoryCredentialStore::new().with_user("user1", "password123");
        let found = store.lookup("user1").unwrap().unwrap();
        assert_eq!(found.expose(), "password123");
        assert!(store.lookup("nobody").unwrap().is_none());
    }

    #[test]
    fn upsert_and_remove() {
        let store = InMemoryCredentialStore::new();
        assert!(store.is_empty());
        store.upsert("admin", "admin123");
        store.upsert("admin", "rotated");
        assert_eq!(store.len(), 1);
        assert_eq!(store.lookup("admin").unwrap().unwrap().expose(), "rotated");
        assert!(store.remove("admin"));
        assert!(!store.remove("admin"));
    }

    #[test]
    fn from_hash_map() {
        let mut users = HashMap::new();
        users.insert("user1".to_string(), "password123".to_string());
        let store = InMemoryCredentialStore::from(users);
        assert!(store.lookup("user1").unwrap().is_some());
    }
}
