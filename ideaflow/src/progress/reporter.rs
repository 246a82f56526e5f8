//! ProgressReporter - the progress and step callback handed to collaborators
//!
//! Percentages go to the store with `try_send` and may be dropped under
//! back-pressure. Steps wait for the store to apply them, and their
//! `StepRecorded` event goes out only once the store has accepted the step.
//! Both share the store's FIFO channel with the orchestrator's own writes, so
//! a session's steps land in the order its task produced them.

use tracing::{debug, warn};

use crate::domain::{Phase, SessionId, StepRecord};
use crate::events::EventEmitter;
use crate::state::{StateManager, StateResponse};

/// Per-session progress and step sink
#[derive(Clone)]
pub struct ProgressReporter {
    session_id: SessionId,
    store: StateManager,
    emitter: EventEmitter,
    /// When set, reports naming any other phase are ignored
    bound_phase: Option<Phase>,
}

impl ProgressReporter {
    pub fn new(session_id: SessionId, store: StateManager, emitter: EventEmitter) -> Self {
        debug!(%session_id, "ProgressReporter::new: called");
        Self {
            session_id,
            store,
            emitter,
            bound_phase: None,
        }
    }

    /// A copy of this reporter that only accepts reports for `phase`
    pub fn for_phase(&self, phase: Phase) -> Self {
        debug!(session_id = %self.session_id, %phase, "ProgressReporter::for_phase: called");
        Self {
            bound_phase: Some(phase),
            ..self.clone()
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Event emitter bound to this session
    pub fn emitter(&self) -> &EventEmitter {
        &self.emitter
    }

    /// Report sub-progress inside `phase`'s range
    ///
    /// The value is clamped into the phase's range. Never blocks; regressions
    /// and out-of-order phases are dropped by the store.
    pub fn report(&self, phase: Phase, percentage: u8) {
        if let Some(bound) = self.bound_phase
            && bound != phase
        {
            debug!(session_id = %self.session_id, %bound, %phase, "ProgressReporter::report: phase mismatch, ignored");
            return;
        }
        let (start, end) = phase.progress_range();
        let clamped = percentage.clamp(start, end);
        debug!(session_id = %self.session_id, %phase, percentage, clamped, "ProgressReporter::report: called");

        if !self.store.try_update_progress(&self.session_id, phase, clamped) {
            debug!(session_id = %self.session_id, "ProgressReporter::report: store busy, progress dropped");
        }
        self.emitter.progress_reported(phase, clamped);
    }

    /// Report progress as a fraction (0.0 to 1.0) of `phase`'s range
    pub fn report_fraction(&self, phase: Phase, fraction: f64) {
        let (start, end) = phase.progress_range();
        let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
        let percentage = start as f64 + (end - start) as f64 * fraction;
        self.report(phase, percentage.round() as u8);
    }

    /// Append a step to the session's step log
    pub async fn record_step(&self, step: StepRecord) -> StateResponse<()> {
        debug!(session_id = %self.session_id, agent = %step.agent, status = %step.status, "ProgressReporter::record_step: called");
        match self.store.append_step(&self.session_id, step.clone()).await {
            Ok(()) => {
                self.emitter.step_recorded(&step);
                Ok(())
            }
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "ProgressReporter::record_step: step rejected");
                Err(e)
            }
        }
    }
}
