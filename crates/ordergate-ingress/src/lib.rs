//! # ordergate-ingress
//!
//! **Admission gates**: the state and decision logic behind each stage of
//! the order-submission pipeline.
//!
//! ## Gates
//!
//! 1. **AttemptTracker**: sliding-window brute-force throttle, keyed by client address
//! 2. **Authenticator**: exact-match credential check against an injected store
//! 3. **validator**: required-field checks and payload sanitization
//! 4. **IdempotencyCache**: at-most-once admission per request [`fingerprint`]
//!
//! ## Request Flow
//!
//! ```text
//! AttemptTracker.reserve() → Authenticator.authenticate() → validator::validate()
//!     → fingerprint::compute() → IdempotencyCache.admit_once()
//! ```
//!
//! All shared state is internally synchronized; every gate takes `&self`.

pub mod attempt_tracker;
pub mod authenticator;
pub mod fingerprint;
pub mod idempotency;
pub mod validator;

pub use attempt_tracker::{AttemptReservation, AttemptTracker};
pub use authenticator::Authenticator;
pub use idempotency::IdempotencyCache;
