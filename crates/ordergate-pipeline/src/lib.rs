//! # ordergate-pipeline
//!
//! **Admission pipeline** for the order-submission endpoint.
//!
//! ## Architecture
//!
//! A [`Pipeline`] owns the gate state from `ordergate-ingress` and runs
//! every request through it in a fixed order:
//! 1. **Throttle**: reject addresses with too many recent failed logins
//! 2. **Authenticate**: check the presented secret against the injected store
//! 3. **Validate**: require `product_id` / `quantity`, sanitize the payload
//! 4. **Dedup**: admit each logical order at most once
//!
//! Each gate emits a [`GateEvent`](ordergate_types::GateEvent) to an
//! [`EventSink`]. Nothing escapes [`Pipeline::submit`] but an
//! [`Outcome`](ordergate_types::Outcome).

pub mod pipeline;
pub mod sink;

pub use pipeline::{GATE_ORDER, Pipeline, PipelineBuilder, SweepReport};
pub use sink::{EventSink, MemorySink, NullSink, TracingSink};
