//! # ordergate-types
//!
//! Shared types, errors, and configuration for the **OrderGate** admission
//! pipeline.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`OrderId`], [`Fingerprint`]
//! - **Request model**: [`Request`], [`Secret`], [`Payload`], [`PayloadValue`], [`SanitizedPayload`]
//! - **Outcome model**: [`Outcome`], [`Confirmation`]
//! - **Gate events**: [`Gate`], [`GateVerdict`], [`GateEvent`]
//! - **Capabilities**: [`Clock`], [`CredentialStore`]
//! - **Configuration**: [`PipelineConfig`], [`ThrottleConfig`], [`CachePolicy`]
//! - **Errors**: [`OrdergateError`] with `OG_ERR_` prefix codes
//! - **Constants**: default window, threshold, and field names

pub mod clock;
pub mod config;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod event;
pub mod ids;
pub mod outcome;
pub mod payload;
pub mod request;

// Re-export all primary types at crate root for ergonomic imports:
//   use ordergate_types::{Request, Outcome, Fingerprint, ...};

pub use clock::*;
pub use config::*;
pub use credentials::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use outcome::*;
pub use payload::*;
pub use request::*;

// Constants are accessed via `ordergate_types::constants::FOO`
// (not re-exported to avoid name collisions).
