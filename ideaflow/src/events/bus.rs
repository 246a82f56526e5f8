//! Event Bus - pub/sub for workflow events
//!
//! Components emit, observers (the JSONL logger, the CLI) subscribe. Delivery
//! is best effort: events are informational and never drive session state.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use super::types::WorkflowEvent;
use crate::domain::{Phase, ReportStatus, SessionId, StepRecord};

/// Default channel capacity (events)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Central event bus for workflow activity
pub struct EventBus {
    tx: broadcast::Sender<WorkflowEvent>,
}

impl EventBus {
    /// Create a new event bus with the given capacity
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "EventBus::new: creating event bus");
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Emit an event to all subscribers
    ///
    /// Fire-and-forget: with no subscribers the event is dropped, and a full
    /// channel drops the oldest events for lagging receivers.
    pub fn emit(&self, event: WorkflowEvent) {
        debug!(
            event_type = event.event_type(),
            session_id = %event.session_id(),
            "EventBus::emit"
        );
        let _ = self.tx.send(event);
    }

    /// Subscribe to events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        debug!("EventBus::subscribe: new subscriber");
        self.tx.subscribe()
    }

    /// Create an emitter handle bound to one session
    pub fn emitter_for(&self, session_id: SessionId) -> EventEmitter {
        debug!(%session_id, "EventBus::emitter_for: creating emitter");
        EventEmitter {
            tx: self.tx.clone(),
            session_id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// Per-session emit handle
///
/// Cheap to clone; every convenience method stamps the bound session ID.
#[derive(Clone)]
pub struct EventEmitter {
    tx: broadcast::Sender<WorkflowEvent>,
    session_id: SessionId,
}

impl EventEmitter {
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Emit a raw event
    pub fn emit(&self, event: WorkflowEvent) {
        debug!(event_type = event.event_type(), "EventEmitter::emit");
        let _ = self.tx.send(event);
    }

    // === Convenience methods ===

    pub fn session_created(&self, user_id: &str, input: &str) {
        self.emit(WorkflowEvent::SessionCreated {
            session_id: self.session_id.clone(),
            user_id: user_id.to_string(),
            input: input.to_string(),
        });
    }

    pub fn phase_started(&self, phase: Phase) {
        self.emit(WorkflowEvent::PhaseStarted {
            session_id: self.session_id.clone(),
            phase,
        });
    }

    pub fn phase_completed(&self, phase: Phase, duration_ms: u64) {
        self.emit(WorkflowEvent::PhaseCompleted {
            session_id: self.session_id.clone(),
            phase,
            duration_ms,
        });
    }

    pub fn phase_failed(&self, phase: Phase, error: &str) {
        self.emit(WorkflowEvent::PhaseFailed {
            session_id: self.session_id.clone(),
            phase,
            error: error.to_string(),
        });
    }

    pub fn progress_reported(&self, phase: Phase, percentage: u8) {
        self.emit(WorkflowEvent::ProgressReported {
            session_id: self.session_id.clone(),
            phase,
            percentage,
        });
    }

    pub fn step_recorded(&self, step: &StepRecord) {
        self.emit(WorkflowEvent::StepRecorded {
            session_id: self.session_id.clone(),
            agent: step.agent.clone(),
            action: step.action.clone(),
            status: step.status,
        });
    }

    pub fn iteration_completed(&self, iteration: u32, candidates: usize, best_total: u32, passed: bool) {
        self.emit(WorkflowEvent::IterationCompleted {
            session_id: self.session_id.clone(),
            iteration,
            candidates,
            best_total,
            passed,
        });
    }

    pub fn session_completed(&self, report_status: ReportStatus) {
        self.emit(WorkflowEvent::SessionCompleted {
            session_id: self.session_id.clone(),
            report_status,
        });
    }

    pub fn session_failed(&self, error: &str) {
        self.emit(WorkflowEvent::SessionFailed {
            session_id: self.session_id.clone(),
            error: error.to_string(),
        });
    }
}

/// Create an event bus wrapped in an Arc for shared ownership
pub fn create_event_bus(capacity: usize) -> Arc<EventBus> {
    Arc::new(EventBus::new(capacity))
}
