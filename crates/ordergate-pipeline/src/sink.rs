//! Event sinks for structured gate events.
//!
//! The pipeline hands every [`GateEvent`] to an injected [`EventSink`];
//! formatting and delivery are the sink's business.

use std::sync::{Mutex, PoisonError};

use ordergate_types::{Gate, GateEvent, GateVerdict};

/// Receives one event per gate evaluated.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &GateEvent);
}

/// Emits each event as a structured `tracing` event.
///
/// Passes log at `DEBUG`, rejections at `INFO`, gate errors at `ERROR`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: &GateEvent) {
        let gate = event.gate;
        let user_id = event.user_id.as_str();
        let client_address = event.client_address.as_str();
        match event.outcome {
            GateVerdict::Pass => {
                tracing::debug!(%gate, user_id, client_address, outcome = "PASS", "gate event");
            }
            GateVerdict::Reject => {
                tracing::info!(%gate, user_id, client_address, outcome = "REJECT", "gate event");
            }
            GateVerdict::Error => {
                tracing::error!(%gate, user_id, client_address, outcome = "ERROR", "gate event");
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&self, _event: &GateEvent) {}
}

/// Collects events in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<GateEvent>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<GateEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Take and clear the recorded events.
    pub fn drain(&self) -> Vec<GateEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Gates visited so far, in order.
    #[must_use]
    pub fn gates(&self) -> Vec<Gate> {
        self.events().iter().map(|e| e.gate).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: &GateEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn event(gate: Gate, outcome: GateVerdict) -> GateEvent {
        GateEvent {
            gate,
            outcome,
            user_id: "user1".into(),
            client_address: "10.0.0.1".into(),
            at: Utc::now(),
        }
    }

    #[test]
    fn memory_sink_records_in_order() {
        let sink = MemorySink::new();
        sink.record(&event(Gate::Throttle, GateVerdict::Pass));
        sink.record(&event(Gate::Authenticate, GateVerdict::Reject));
        assert_eq!(sink.gates(), [Gate::Throttle, Gate::Authenticate]);
        assert_eq!(sink.len(), 2);

        let drained = sink.drain();
        assert_eq!(drained.len(), 2);
        assert!(sink.is_empty());
    }

    #[test]
    fn tracing_sink_accepts_every_verdict() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let sink = TracingSink;
        for outcome in [GateVerdict::Pass, GateVerdict::Reject, GateVerdict::Error] {
            sink.record(&event(Gate::Dedup, outcome));
        }
    }
}
