//! Brute-force gate state: per-address sliding window of failed logins.
//!
//! Each client address owns an `AttemptRecord` holding the timestamps of
//! its recent authentication failures. Expired timestamps are pruned
//! lazily, whenever the record is touched, never by a background sweep.
//!
//! Records live in a sharded [`DashMap`]: the prune-then-count and
//! prune-then-append sequences run while holding the shard lock for that
//! address, so two concurrent failures from one address cannot lose an
//! entry, and different addresses never contend on the same record.
//!
//! ## Reservations
//!
//! The pipeline checks the throttle before authentication and records the
//! failure after it, so the two steps cannot share one lock. To keep a
//! burst of concurrent guesses from slipping past the check together,
//! [`AttemptTracker::reserve`] counts every attempt still waiting on its
//! credential check as a potential failure:
//!
//! ```text
//! failures + in_flight <  max_failures  → reserve, proceed
//! failures             >= max_failures  → Throttled
//! otherwise                             → wait for an in-flight attempt to settle
//! ```
//!
//! A reservation becomes a failure timestamp via
//! [`AttemptReservation::fail`] or is released on drop (success, internal
//! error, or unwinding). At most `max_failures` credential checks per
//! address are ever evaluated inside one window.

use std::sync::{Condvar, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use ordergate_types::{OrdergateError, Result, ThrottleConfig};

/// Failure timestamps for one client address.
#[derive(Debug, Clone, Default)]
struct AttemptRecord {
    failures: Vec<DateTime<Utc>>,
    /// Reservations handed out and not yet settled.
    in_flight: usize,
}

impl AttemptRecord {
    /// Drop failures that are `window` or more older than `now`.
    ///
    /// Uses `retain` rather than popping from the front: requests are
    /// stamped before they reach the tracker, so appends are not
    /// guaranteed to arrive in timestamp order.
    fn prune(&mut self, now: DateTime<Utc>, window: Duration) {
        self.failures.retain(|t| now.signed_duration_since(*t) < window);
    }

    fn count_within(&self, now: DateTime<Utc>, window: Duration) -> usize {
        self.failures
            .iter()
            .filter(|t| now.signed_duration_since(**t) < window)
            .count()
    }

    fn is_idle(&self) -> bool {
        self.failures.is_empty() && self.in_flight == 0
    }
}

/// An admitted attempt whose credential check has not finished yet.
///
/// Counts toward the address's threshold until settled. Dropping it
/// releases the slot without recording anything.
#[derive(Debug)]
#[must_use = "dropping a reservation releases it immediately"]
pub struct AttemptReservation<'a> {
    tracker: &'a AttemptTracker,
    client_address: String,
    settled: bool,
}

impl AttemptReservation<'_> {
    /// Convert the reservation into a failure recorded at `now`.
    /// Returns the failure count now inside the window.
    pub fn fail(mut self, now: DateTime<Utc>) -> usize {
        self.settled = true;
        self.tracker.settle_failure(&self.client_address, now)
    }

    #[must_use]
    pub fn client_address(&self) -> &str {
        &self.client_address
    }
}

impl Drop for AttemptReservation<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.tracker.release(&self.client_address);
        }
    }
}

/// Sliding-window failure counter keyed by client address.
///
/// Successful logins leave the failure history untouched: earlier failures
/// keep counting until they age out of the window.
#[derive(Debug)]
pub struct AttemptTracker {
    /// `client address → recent failures + in-flight attempts`
    records: DashMap<String, AttemptRecord>,
    window: Duration,
    window_secs: u64,
    max_failures: usize,
    /// Bumped every time a reservation settles; waiters sleep until it moves.
    settled: Mutex<u64>,
    settle_signal: Condvar,
}

impl AttemptTracker {
    /// Create a tracker from a validated throttle config.
    #[must_use]
    pub fn new(config: &ThrottleConfig) -> Self {
        Self {
            records: DashMap::new(),
            window: config.window(),
            window_secs: config.window_secs,
            max_failures: config.max_failures,
            settled: Mutex::new(0),
            settle_signal: Condvar::new(),
        }
    }

    /// Throttle check on recorded failures alone.
    ///
    /// Prunes the address's record, then denies if the remaining failures
    /// reach the threshold. An address with no record is always allowed
    /// and no record is created for it.
    pub fn allow(&self, client_address: &str, now: DateTime<Utc>) -> Result<()> {
        let Some(mut record) = self.records.get_mut(client_address) else {
            return Ok(());
        };
        self.check(client_address, &mut record, now)
    }

    /// Throttle check that also claims a slot for the credential check
    /// that follows it.
    ///
    /// Blocks while the address's failure budget is fully taken by other
    /// in-flight attempts, then re-checks against the settled state.
    ///
    /// # Errors
    /// [`OrdergateError::Throttled`] once recorded failures reach the
    /// threshold.
    pub fn reserve(
        &self,
        client_address: &str,
        now: DateTime<Utc>,
    ) -> Result<AttemptReservation<'_>> {
        loop {
            let generation = *self.settled.lock().unwrap_or_else(PoisonError::into_inner);
            {
                let mut record = self.records.entry(client_address.to_string()).or_default();
                self.check(client_address, &mut record, now)?;
                if record.failures.len() + record.in_flight < self.max_failures {
                    record.in_flight += 1;
                    return Ok(AttemptReservation {
                        tracker: self,
                        client_address: client_address.to_string(),
                        settled: false,
                    });
                }
            }

            tracing::trace!(client_address, "waiting for in-flight attempts to settle");
            let guard = self.settled.lock().unwrap_or_else(PoisonError::into_inner);
            drop(
                self.settle_signal
                    .wait_while(guard, |current| *current == generation)
                    .unwrap_or_else(PoisonError::into_inner),
            );
        }
    }

    /// Append a failed authentication for `client_address`, creating the
    /// record if needed. Returns the failure count now inside the window.
    pub fn record_failure(&self, client_address: &str, now: DateTime<Utc>) -> usize {
        let mut record = self.records.entry(client_address.to_string()).or_default();
        Self::append(client_address, &mut record, now, self.window)
    }

    /// Check, then record, in one step: returns whether this attempt was
    /// allowed. A denied attempt is not recorded; an allowed attempt with
    /// `auth_succeeded == false` is appended after the check.
    pub fn check_and_record(
        &self,
        client_address: &str,
        now: DateTime<Utc>,
        auth_succeeded: bool,
    ) -> bool {
        if auth_succeeded {
            return self.allow(client_address, now).is_ok();
        }
        let mut record = self.records.entry(client_address.to_string()).or_default();
        if self.check(client_address, &mut record, now).is_err() {
            return false;
        }
        Self::append(client_address, &mut record, now, self.window);
        true
    }

    /// Failures from `client_address` still inside the window at `now`.
    /// Read-only: does not prune.
    #[must_use]
    pub fn failures(&self, client_address: &str, now: DateTime<Utc>) -> usize {
        self.records
            .get(client_address)
            .map_or(0, |r| r.count_within(now, self.window))
    }

    /// Reservations from `client_address` not yet settled.
    #[must_use]
    pub fn in_flight(&self, client_address: &str) -> usize {
        self.records.get(client_address).map_or(0, |r| r.in_flight)
    }

    /// Number of addresses with a record (including not-yet-pruned ones).
    #[must_use]
    pub fn tracked_addresses(&self) -> usize {
        self.records.len()
    }

    /// Drop every address whose failures have all left the window and
    /// that has no attempt in flight. Returns how many were removed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| {
            record.prune(now, self.window);
            !record.is_idle()
        });
        let removed = before.saturating_sub(self.records.len());
        if removed > 0 {
            tracing::debug!(removed, "swept expired attempt records");
        }
        removed
    }

    #[must_use]
    pub fn max_failures(&self) -> usize {
        self.max_failures
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    fn check(
        &self,
        client_address: &str,
        record: &mut AttemptRecord,
        now: DateTime<Utc>,
    ) -> Result<()> {
        record.prune(now, self.window);
        let failures = record.failures.len();
        if failures >= self.max_failures {
            tracing::warn!(
                client_address,
                failures,
                window_secs = self.window_secs,
                "address throttled"
            );
            return Err(OrdergateError::Throttled {
                client_address: client_address.to_string(),
                failures,
                window_secs: self.window_secs,
            });
        }
        Ok(())
    }

    fn append(
        client_address: &str,
        record: &mut AttemptRecord,
        now: DateTime<Utc>,
        window: Duration,
    ) -> usize {
        record.prune(now, window);
        record.failures.push(now);
        let failures = record.failures.len();
        tracing::debug!(client_address, failures, "failed attempt recorded");
        failures
    }

    fn settle_failure(&self, client_address: &str, now: DateTime<Utc>) -> usize {
        let failures = {
            let mut record = self.records.entry(client_address.to_string()).or_default();
            record.in_flight = record.in_flight.saturating_sub(1);
            Self::append(client_address, &mut record, now, self.window)
        };
        self.notify_settled();
        failures
    }

    fn release(&self, client_address: &str) {
        if let Some(mut record) = self.records.get_mut(client_address) {
            record.in_flight = record.in_flight.saturating_sub(1);
        }
        self.records.remove_if(client_address, |_, record| record.is_idle());
        self.notify_settled();
    }

    fn notify_settled(&self) {
        let mut generation = self.settled.lock().unwrap_or_else(PoisonError::into_inner);
        *generation = generation.wrapping_add(1);
        self.settle_signal.notify_all();
    }
}

impl Default for AttemptTracker {
    fn default() -> Self {
        Self::new(&ThrottleConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IP: &str = "10.0.0.1";

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(secs)
    }

    #[test]
    fn unknown_address_allowed_without_record() {
        let tracker = AttemptTracker::default();
        assert!(tracker.allow(IP, t(0)).is_ok());
        assert_eq!(tracker.tracked_addresses(), 0);
    }

    #[test]
    fn threshold_blocks() {
        let tracker = AttemptTracker::default();
        tracker.record_failure(IP, t(0));
        tracker.record_failure(IP, t(1));
        assert!(tracker.allow(IP, t(2)).is_ok(), "2 failures < threshold 3");

        tracker.record_failure(IP, t(2));
        let err = tracker.allow(IP, t(3)).unwrap_err();
        assert!(
            matches!(err, OrdergateError::Throttled { failures: 3, window_secs: 300, .. }),
            "got {err:?}"
        );
    }

    #[test]
    fn window_elapse_unblocks() {
        let tracker = AttemptTracker::default();
        for s in 0..3 {
            tracker.record_failure(IP, t(s));
        }
        assert!(tracker.allow(IP, t(299)).is_err());
        // t(0) ages out at exactly 300s, leaving 2 failures.
        assert!(tracker.allow(IP, t(300)).is_ok());
        assert_eq!(tracker.failures(IP, t(300)), 2);
        assert_eq!(tracker.failures(IP, t(302)), 0);
    }

    #[test]
    fn success_does_not_reset() {
        let tracker = AttemptTracker::default();
        tracker.record_failure(IP, t(0));
        tracker.record_failure(IP, t(1));
        assert!(tracker.check_and_record(IP, t(2), true));
        assert_eq!(tracker.failures(IP, t(2)), 2);

        // The third failure is checked first (2 < 3, allowed), then appended.
        assert!(tracker.check_and_record(IP, t(3), false));
        assert_eq!(tracker.failures(IP, t(3)), 3);
        assert!(!tracker.check_and_record(IP, t(4), true));
    }

    #[test]
    fn denied_attempt_is_not_recorded() {
        let tracker = AttemptTracker::default();
        for s in 0..3 {
            assert!(tracker.check_and_record(IP, t(s), false));
        }
        assert!(!tracker.check_and_record(IP, t(3), false));
        assert_eq!(tracker.failures(IP, t(3)), 3);
    }

    #[test]
    fn success_on_unknown_address_creates_no_record() {
        let tracker = AttemptTracker::default();
        assert!(tracker.check_and_record(IP, t(0), true));
        assert_eq!(tracker.tracked_addresses(), 0);
    }

    #[test]
    fn failed_reservation_becomes_a_failure() {
        let tracker = AttemptTracker::default();
        let reservation = tracker.reserve(IP, t(0)).unwrap();
        assert_eq!(reservation.client_address(), IP);
        assert_eq!(tracker.in_flight(IP), 1);

        assert_eq!(reservation.fail(t(1)), 1);
        assert_eq!(tracker.in_flight(IP), 0);
        assert_eq!(tracker.failures(IP, t(1)), 1);
    }

    #[test]
    fn dropped_reservation_leaves_no_trace() {
        let tracker = AttemptTracker::default();
        drop(tracker.reserve(IP, t(0)).unwrap());
        assert_eq!(tracker.in_flight(IP), 0);
        assert_eq!(tracker.tracked_addresses(), 0);

        // An address with failures keeps them after a released attempt.
        tracker.record_failure(IP, t(1));
        drop(tracker.reserve(IP, t(2)).unwrap());
        assert_eq!(tracker.failures(IP, t(2)), 1);
        assert_eq!(tracker.tracked_addresses(), 1);
    }

    #[test]
    fn reserve_is_throttled_on_recorded_failures() {
        let tracker = AttemptTracker::default();
        for s in 0..3 {
            tracker.record_failure(IP, t(s));
        }
        let err = tracker.reserve(IP, t(3)).unwrap_err();
        assert!(matches!(err, OrdergateError::Throttled { failures: 3, .. }));
        assert_eq!(tracker.in_flight(IP), 0);
    }

    #[test]
    fn in_flight_attempts_hold_back_further_guesses() {
        let tracker = AttemptTracker::default();
        let held: Vec<_> = (0..3).map(|_| tracker.reserve(IP, t(0)).unwrap()).collect();
        assert_eq!(tracker.in_flight(IP), 3);
        assert!(tracker.allow(IP, t(0)).is_ok(), "nothing recorded yet");

        std::thread::scope(|s| {
            // Blocks until the held attempts settle, then sees 3 failures.
            let waiter = s.spawn(|| tracker.reserve(IP, t(0)).map(|_| ()));
            for reservation in held {
                reservation.fail(t(0));
            }
            let err = waiter.join().unwrap().unwrap_err();
            assert!(matches!(err, OrdergateError::Throttled { failures: 3, .. }));
        });
        assert_eq!(tracker.failures(IP, t(0)), 3);
        assert_eq!(tracker.in_flight(IP), 0);
    }

    #[test]
    fn released_attempt_lets_a_waiter_through() {
        let tracker = AttemptTracker::default();
        let mut held: Vec<_> = (0..3).map(|_| tracker.reserve(IP, t(0)).unwrap()).collect();

        std::thread::scope(|s| {
            let waiter = s.spawn(|| tracker.reserve(IP, t(0)).map(|r| r.fail(t(0))));
            drop(held.pop());
            assert_eq!(waiter.join().unwrap().unwrap(), 1);
        });
        drop(held);
        assert_eq!(tracker.failures(IP, t(0)), 1);
        assert_eq!(tracker.in_flight(IP), 0);
    }

    #[test]
    fn sweep_keeps_addresses_with_attempts_in_flight() {
        let tracker = AttemptTracker::default();
        let reservation = tracker.reserve(IP, t(0)).unwrap();
        assert_eq!(tracker.sweep(t(1_000)), 0);
        assert_eq!(tracker.tracked_addresses(), 1);
        drop(reservation);
        assert_eq!(tracker.tracked_addresses(), 0);
    }

    #[test]
    fn addresses_are_independent() {
        let tracker = AttemptTracker::default();
        for s in 0..3 {
            tracker.record_failure(IP, t(s));
        }
        assert!(tracker.allow(IP, t(5)).is_err());
        assert!(tracker.allow("10.0.0.2", t(5)).is_ok());
    }

    #[test]
    fn out_of_order_appends_prune_correctly() {
        let tracker = AttemptTracker::default();
        tracker.record_failure(IP, t(100));
        tracker.record_failure(IP, t(0));
        // At 350, only the t(100) failure is inside the window.
        assert_eq!(tracker.failures(IP, t(350)), 1);
        assert_eq!(tracker.record_failure(IP, t(350)), 2);
    }

    #[test]
    fn sweep_removes_only_expired_addresses() {
        let tracker = AttemptTracker::default();
        tracker.record_failure("a", t(0));
        tracker.record_failure("b", t(200));
        assert_eq!(tracker.tracked_addresses(), 2);

        assert_eq!(tracker.sweep(t(400)), 1);
        assert_eq!(tracker.tracked_addresses(), 1);
        assert_eq!(tracker.failures("b", t(400)), 1);
    }

    #[test]
    fn custom_threshold_and_window() {
        let tracker = AttemptTracker::new(&ThrottleConfig {
            window_secs: 10,
            max_failures: 1,
        });
        tracker.record_failure(IP, t(0));
        assert!(tracker.allow(IP, t(9)).is_err());
        assert!(tracker.allow(IP, t(10)).is_ok());
        assert_eq!(tracker.max_failures(), 1);
        assert_eq!(tracker.window(), Duration::seconds(10));
    }

    #[test]
    fn concurrent_failures_are_all_recorded() {
        let tracker = AttemptTracker::new(&ThrottleConfig {
            window_secs: 300,
            max_failures: 1_000,
        });
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..50 {
                        tracker.record_failure(IP, t(1));
                    }
                });
            }
        });
        assert_eq!(tracker.failures(IP, t(1)), 400);
    }
}
