//! The admission pipeline.
//!
//! ```text
//! Start → Throttle → Authenticate → Validate → Dedup → Accepted
//!            │            │             │         │
//!            ▼            ▼             ▼         ▼
//!        Throttled  Unauthenticated InvalidData Duplicate
//! ```
//!
//! Gates run in the fixed order of [`GATE_ORDER`], once each, with no
//! retries. The first gate to fail decides the outcome and no later gate
//! is evaluated. The pipeline owns the gates' state but keeps none of its
//! own; every request gets exactly one [`Outcome`].

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ordergate_ingress::{
    AttemptReservation, AttemptTracker, Authenticator, IdempotencyCache, fingerprint, validator,
};
use ordergate_types::{
    Clock, Confirmation, CredentialStore, Fingerprint, Gate, GateEvent, GateVerdict, OrderId,
    OrdergateError, Outcome, Payload, PipelineConfig, Request, Result, SanitizedPayload, Secret,
    SystemClock,
};

use crate::sink::{EventSink, TracingSink};

/// Evaluation order of the gates. The throttle check must precede
/// authentication so a blocked address learns nothing about credentials.
pub const GATE_ORDER: [Gate; 4] = [
    Gate::Throttle,
    Gate::Authenticate,
    Gate::Validate,
    Gate::Dedup,
];

/// What later gates learn from earlier ones within one request.
#[derive(Debug, Default)]
struct Admission<'a> {
    /// Held from the throttle check until authentication settles it.
    reservation: Option<AttemptReservation<'a>>,
    sanitized: Option<SanitizedPayload>,
    fingerprint: Option<Fingerprint>,
}

impl Admission<'_> {
    fn confirm(self) -> Result<Confirmation> {
        match (self.sanitized, self.fingerprint) {
            (Some(payload), Some(fingerprint)) => Ok(Confirmation {
                order_id: OrderId::new(),
                product_id: payload.product_id().to_string(),
                quantity: payload.quantity(),
                fingerprint,
            }),
            _ => Err(OrdergateError::Internal(
                "gate sequence ended without a sanitized, fingerprinted payload".into(),
            )),
        }
    }
}

/// Counts removed by [`Pipeline::sweep`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    pub attempt_records: usize,
    pub fingerprints: usize,
}

/// Sequences the four gates over shared, internally synchronized state.
///
/// `Pipeline` is `Send + Sync`; share it behind an `Arc` and call
/// [`submit`](Self::submit) from as many threads as needed.
pub struct Pipeline {
    config: PipelineConfig,
    tracker: AttemptTracker,
    authenticator: Authenticator,
    cache: IdempotencyCache,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
}

impl Pipeline {
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Stamp a new request from the clock and run it through every gate.
    pub fn submit(
        &self,
        user_id: &str,
        secret: &str,
        client_address: &str,
        payload: Payload,
    ) -> Outcome {
        let request = Request::new(
            user_id,
            Secret::new(secret),
            client_address,
            payload,
            self.clock.now(),
        );
        self.process(&request)
    }

    /// Run an already-stamped request through every gate.
    ///
    /// Never panics and never returns [`Outcome::Accepted`] unless all four
    /// gates passed. A panic inside an injected capability is contained
    /// here and reported as [`Outcome::InternalError`].
    pub fn process(&self, request: &Request) -> Outcome {
        match catch_unwind(AssertUnwindSafe(|| self.evaluate(request))) {
            Ok(Ok(confirmation)) => {
                tracing::info!(
                    user_id = %request.user_id,
                    order_id = %confirmation.order_id,
                    product_id = %confirmation.product_id,
                    quantity = confirmation.quantity,
                    "order accepted"
                );
                Outcome::Accepted(confirmation)
            }
            Ok(Err(err)) => {
                let outcome = err.outcome();
                if outcome == Outcome::InternalError {
                    tracing::error!(user_id = %request.user_id, error = %err, "gate evaluation failed");
                } else {
                    tracing::debug!(user_id = %request.user_id, error = %err, "request rejected");
                }
                outcome
            }
            Err(_) => {
                tracing::error!(
                    user_id = %request.user_id,
                    client_address = %request.client_address,
                    "gate evaluation panicked"
                );
                Outcome::InternalError
            }
        }
    }

    fn evaluate(&self, request: &Request) -> Result<Confirmation> {
        let mut admission = Admission::default();
        for gate in GATE_ORDER {
            let result = self.run_gate(gate, request, &mut admission);
            self.emit(gate, &result, request);
            result?;
        }
        admission.confirm()
    }

    fn run_gate<'a>(
        &'a self,
        gate: Gate,
        request: &Request,
        admission: &mut Admission<'a>,
    ) -> Result<()> {
        let now = request.submitted_at;
        match gate {
            Gate::Throttle => {
                admission.reservation = Some(self.tracker.reserve(&request.client_address, now)?);
                Ok(())
            }
            Gate::Authenticate => {
                // Dropping the reservation releases it without counting a failure.
                let reservation = admission.reservation.take().ok_or_else(|| {
                    OrdergateError::Internal("authentication reached before throttle".into())
                })?;
                if self.authenticator.authenticate(&request.user_id, &request.secret)? {
                    Ok(())
                } else {
                    reservation.fail(now);
                    Err(OrdergateError::Unauthenticated {
                        user_id: request.user_id.clone(),
                    })
                }
            }
            Gate::Validate => {
                admission.sanitized = Some(validator::validate(&request.payload)?);
                Ok(())
            }
            Gate::Dedup => {
                let payload = admission.sanitized.as_ref().ok_or_else(|| {
                    OrdergateError::Internal("dedup reached before validation".into())
                })?;
                let fp = fingerprint::compute(&request.user_id, payload)?;
                if !self.cache.admit_once(fp, now) {
                    return Err(OrdergateError::Duplicate(fp));
                }
                admission.fingerprint = Some(fp);
                Ok(())
            }
        }
    }

    fn emit(&self, gate: Gate, result: &Result<()>, request: &Request) {
        let outcome = match result {
            Ok(()) => GateVerdict::Pass,
            Err(err) if err.outcome() == Outcome::InternalError => GateVerdict::Error,
            Err(_) => GateVerdict::Reject,
        };
        self.sink.record(&GateEvent {
            gate,
            outcome,
            user_id: request.user_id.clone(),
            client_address: request.client_address.clone(),
            at: request.submitted_at,
        });
    }

    /// Evict expired throttle records and, under a TTL policy, expired
    /// fingerprints. Lazy pruning on each check does not need this; it
    /// bounds memory for addresses and orders that are never seen again.
    pub fn sweep(&self) -> SweepReport {
        self.sweep_at(self.clock.now())
    }

    pub fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        SweepReport {
            attempt_records: self.tracker.sweep(now),
            fingerprints: self.cache.sweep(now),
        }
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[must_use]
    pub fn tracker(&self) -> &AttemptTracker {
        &self.tracker
    }

    #[must_use]
    pub fn cache(&self) -> &IdempotencyCache {
        &self.cache
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("tracked_addresses", &self.tracker.tracked_addresses())
            .field("cached_fingerprints", &self.cache.len())
            .finish_non_exhaustive()
    }
}

/// Assembles a [`Pipeline`] from its configuration and injected capabilities.
#[derive(Default)]
pub struct PipelineBuilder {
    config: PipelineConfig,
    credentials: Option<Arc<dyn CredentialStore>>,
    clock: Option<Arc<dyn Clock>>,
    sink: Option<Arc<dyn EventSink>>,
}

impl PipelineBuilder {
    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Required.
    #[must_use]
    pub fn credentials(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(store);
        self
    }

    /// Defaults to [`SystemClock`].
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Defaults to [`TracingSink`].
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// # Errors
    /// [`OrdergateError::Configuration`] if the config is invalid or no
    /// credential store was supplied.
    pub fn build(self) -> Result<Pipeline> {
        self.config.validate()?;
        let credentials = self.credentials.ok_or_else(|| {
            OrdergateError::Configuration("a credential store is required".into())
        })?;
        Ok(Pipeline {
            tracker: AttemptTracker::new(&self.config.throttle),
            authenticator: Authenticator::new(credentials),
            cache: IdempotencyCache::new(self.config.cache.clone()),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            sink: self.sink.unwrap_or_else(|| Arc::new(TracingSink)),
            config: self.config,
        })
    }
}
