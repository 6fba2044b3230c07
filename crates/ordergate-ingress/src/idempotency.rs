//! Dedup gate state — at-most-once admission per request fingerprint.
//!
//! The first caller to present a fingerprint wins; every later caller with
//! the same fingerprint is told it is a duplicate. The check and the insert
//! are one operation on the fingerprint's map entry (held under its shard
//! lock), so two simultaneous identical submissions always produce exactly
//! one admission.
//!
//! How fingerprints leave the cache is governed by [`CachePolicy`].

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use ordergate_types::{CachePolicy, Fingerprint, duration_from_secs};

/// Concurrent set of admitted fingerprints.
#[derive(Debug)]
pub struct IdempotencyCache {
    /// `fingerprint → time of admission`
    admitted: DashMap<Fingerprint, DateTime<Utc>>,
    /// Admission order, front = oldest. Only maintained under `Capacity`.
    order: Mutex<VecDeque<Fingerprint>>,
    policy: CachePolicy,
    ttl: Option<Duration>,
}

impl IdempotencyCache {
    /// Create a cache with the given (validated) eviction policy.
    #[must_use]
    pub fn new(policy: CachePolicy) -> Self {
        let ttl = match policy {
            CachePolicy::Ttl { ttl_secs } => Some(duration_from_secs(ttl_secs).unwrap_or(Duration::MAX)),
            CachePolicy::Unbounded | CachePolicy::Capacity { .. } => None,
        };
        Self {
            admitted: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            policy,
            ttl,
        }
    }

    /// Admit `fingerprint` if it has not been admitted before.
    ///
    /// Returns `true` (and records the fingerprint) for the first caller;
    /// `false`, with no mutation, for every later one. Under a TTL policy
    /// an expired entry counts as absent and is re-admitted in place.
    pub fn admit_once(&self, fingerprint: Fingerprint, now: DateTime<Utc>) -> bool {
        let admitted = match self.admitted.entry(fingerprint) {
            Entry::Occupied(mut entry) => {
                if self.is_expired(*entry.get(), now) {
                    entry.insert(now);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        };

        if admitted {
            self.enforce_capacity(fingerprint);
        } else {
            tracing::debug!(fingerprint = %fingerprint, "duplicate fingerprint");
        }
        admitted
    }

    /// Whether `fingerprint` is currently admitted (and not expired) at `now`.
    #[must_use]
    pub fn is_admitted(&self, fingerprint: &Fingerprint, now: DateTime<Utc>) -> bool {
        self.admitted
            .get(fingerprint)
            .is_some_and(|at| !self.is_expired(*at, now))
    }

    /// Drop TTL-expired fingerprints. Returns how many were removed.
    /// A no-op for the other policies.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        if self.ttl.is_none() {
            return 0;
        }
        let before = self.admitted.len();
        self.admitted.retain(|_, at| !self.is_expired(*at, now));
        let removed = before.saturating_sub(self.admitted.len());
        if removed > 0 {
            tracing::debug!(removed, "swept expired fingerprints");
        }
        removed
    }

    #[must_use]
    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Number of fingerprints held (expired-but-unswept ones included).
    #[must_use]
    pub fn len(&self) -> usize {
        self.admitted.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.admitted.is_empty()
    }

    fn is_expired(&self, admitted_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.ttl
            .is_some_and(|ttl| now.signed_duration_since(admitted_at) >= ttl)
    }

    /// Evict oldest admissions beyond `max_entries`. Called with no map
    /// entry guard held.
    fn enforce_capacity(&self, fingerprint: Fingerprint) {
        let CachePolicy::Capacity { max_entries } = self.policy else {
            return;
        };
        let mut order = self.order.lock().unwrap_or_else(PoisonError::into_inner);
        order.push_back(fingerprint);
        while order.len() > max_entries {
            if let Some(oldest) = order.pop_front() {
                self.admitted.remove(&oldest);
                tracing::trace!(fingerprint = %oldest, "evicted oldest fingerprint");
            }
        }
    }
}

impl Default for IdempotencyCache {
    fn default() -> Self {
        Self::new(CachePolicy::Unbounded)
    }
}
