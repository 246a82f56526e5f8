//! PhaseOrchestrator - runs one session through the phase pipeline
//!
//! Phases run strictly in order. Each one moves the session to its starting
//! percentage, records an in-progress step, runs its agent under a timeout
//! raced against cancellation, then records a completed or failed step. The
//! first failure ends the session.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::{FinalReport, Phase, SessionId, SessionStatus, StepRecord};
use crate::events::{EventBus, EventEmitter};
use crate::progress::ProgressReporter;
use crate::refine::IdeationOutcome;
use crate::state::{StateManager, StateResponse};

use super::phase::{PhaseContext, PhaseError, PhaseOutput, PhasePipeline};
use super::report::ReportSink;

/// Longest error message stored on a failed session
pub const MAX_ERROR_LEN: usize = 500;

/// Drives sessions through research, ideation, analysis and report
pub struct PhaseOrchestrator {
    store: StateManager,
    bus: Arc<EventBus>,
    pipeline: Arc<PhasePipeline>,
    sink: Option<Arc<dyn ReportSink>>,
    phase_timeout: Duration,
}

/// Session fields every phase context repeats
struct SessionInfo<'a> {
    session_id: &'a SessionId,
    user_id: &'a str,
    input: &'a str,
    requirements: Option<String>,
}

impl PhaseOrchestrator {
    pub fn new(store: StateManager, bus: Arc<EventBus>, pipeline: Arc<PhasePipeline>, phase_timeout: Duration) -> Self {
        debug!(?phase_timeout, "PhaseOrchestrator::new: called");
        Self {
            store,
            bus,
            pipeline,
            sink: None,
            phase_timeout,
        }
    }

    /// Hand every final report to `sink`
    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Run every phase for `session_id` and return the terminal status
    ///
    /// Phase failures are recorded on the session and reported as
    /// `Ok(SessionStatus::Failed)`. `Err` means the store itself refused a
    /// write, including `InvalidPhase` when another executor already claimed
    /// the session.
    pub async fn execute_workflow(
        &self,
        session_id: &SessionId,
        user_input: &str,
        user_id: &str,
        cancel: CancellationToken,
    ) -> StateResponse<SessionStatus> {
        debug!(%session_id, %user_id, "execute_workflow: called");
        let state = self.store.get(session_id).await?;
        if state.is_terminal() {
            debug!(%session_id, status = %state.status, "execute_workflow: session already terminal");
            return Ok(state.status);
        }

        info!(%session_id, %user_id, "Starting workflow");
        let emitter = self.bus.emitter_for(session_id.clone());
        let reporter = ProgressReporter::new(session_id.clone(), self.store.clone(), emitter.clone());
        let info = SessionInfo {
            session_id,
            user_id,
            input: user_input.trim(),
            requirements: state.requirements,
        };
        let mut prior: BTreeMap<Phase, Value> = BTreeMap::new();

        for phase in Phase::PIPELINE {
            match self.run_phase(phase, &info, &prior, &reporter, &emitter, &cancel).await? {
                Ok(output) => {
                    prior.insert(phase, output.data);
                }
                Err(e) => {
                    self.fail(&info, phase, &e, &emitter).await?;
                    return Ok(SessionStatus::Failed);
                }
            }
        }

        self.complete(&info, prior, &emitter).await?;
        Ok(SessionStatus::Completed)
    }

    /// One phase; the outer result is the store, the inner one the agent
    async fn run_phase(
        &self,
        phase: Phase,
        info: &SessionInfo<'_>,
        prior: &BTreeMap<Phase, Value>,
        reporter: &ProgressReporter,
        emitter: &EventEmitter,
        cancel: &CancellationToken,
    ) -> StateResponse<Result<PhaseOutput, PhaseError>> {
        debug!(session_id = %info.session_id, %phase, "run_phase: called");
        if cancel.is_cancelled() {
            info!(session_id = %info.session_id, %phase, "Session cancelled before phase");
            return Ok(Err(PhaseError::Cancelled));
        }
        let Some(agent) = self.pipeline.agent(phase) else {
            return Ok(Err(PhaseError::Collaborator(format!("no agent for {} phase", phase))));
        };

        let (start, _) = phase.progress_range();
        self.store.update_progress(info.session_id, phase, start).await?;
        let step = StepRecord::in_progress(phase.as_str(), format!("Starting {} phase", phase))
            .with_details(json!({ "agent": agent.name() }));
        if phase == Phase::PIPELINE[0] {
            // Refused if another executor already recorded a step
            self.store.claim(info.session_id, step.clone()).await?;
        } else {
            self.store.append_step(info.session_id, step.clone()).await?;
        }
        emitter.step_recorded(&step);
        emitter.phase_started(phase);
        info!(session_id = %info.session_id, %phase, agent = agent.name(), "Phase started");

        let ctx = PhaseContext {
            session_id: info.session_id.clone(),
            user_id: info.user_id.to_string(),
            input: info.input.to_string(),
            requirements: info.requirements.clone(),
            phase,
            prior: prior.clone(),
            cancel: cancel.clone(),
        };
        let phase_reporter = reporter.for_phase(phase);
        let timeout_ms = self.phase_timeout.as_millis() as u64;
        let started = Instant::now();

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PhaseError::Cancelled),
            result = tokio::time::timeout(self.phase_timeout, agent.execute(&ctx, &phase_reporter)) => {
                result.unwrap_or(Err(PhaseError::Timeout { timeout_ms }))
            }
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        if let Ok(output) = &result {
            let action = output
                .summary
                .clone()
                .unwrap_or_else(|| format!("Completed {} phase", phase));
            let step = StepRecord::completed(phase.as_str(), action)
                .with_duration_ms(duration_ms)
                .with_details(json!({ "agent": agent.name() }));
            self.store.append_step(info.session_id, step.clone()).await?;
            emitter.step_recorded(&step);
            emitter.phase_completed(phase, duration_ms);
            info!(session_id = %info.session_id, %phase, duration_ms, "Phase completed");
        } else {
            debug!(session_id = %info.session_id, %phase, duration_ms, "run_phase: agent failed");
        }
        Ok(result)
    }

    /// Record the failure and make the session terminal
    async fn fail(&self, info: &SessionInfo<'_>, phase: Phase, err: &PhaseError, emitter: &EventEmitter) -> StateResponse<()> {
        let message = failure_message(phase, err);
        error!(session_id = %info.session_id, %phase, error = %err, "Phase failed");

        let step = StepRecord::failed(phase.as_str(), message.clone()).with_details(json!({ "error": err.to_string() }));
        match self.store.append_step(info.session_id, step.clone()).await {
            Ok(()) => emitter.step_recorded(&step),
            Err(e) => warn!(session_id = %info.session_id, error = %e, "fail: could not record failed step"),
        }
        emitter.phase_failed(phase, &err.to_string());

        self.store.mark_failed(info.session_id, &message).await?;
        emitter.session_failed(&message);

        let report = FinalReport::failed(info.session_id.clone(), info.user_id, message);
        self.hand_off(&report).await;
        Ok(())
    }

    /// Assemble the final report and make the session terminal
    async fn complete(
        &self,
        info: &SessionInfo<'_>,
        mut prior: BTreeMap<Phase, Value>,
        emitter: &EventEmitter,
    ) -> StateResponse<()> {
        let idea = prior
            .get(&Phase::Ideation)
            .and_then(|data| serde_json::from_value::<IdeationOutcome>(data.clone()).ok())
            .map(|outcome| outcome.summary());
        let document = prior.remove(&Phase::Report).unwrap_or(Value::Null);
        let report = FinalReport::completed(info.session_id.clone(), info.user_id, idea, document);

        self.store.mark_completed(info.session_id, report.clone()).await?;
        emitter.session_completed(report.status);
        info!(session_id = %info.session_id, status = %report.status, "Workflow completed");

        self.hand_off(&report).await;
        Ok(())
    }

    async fn hand_off(&self, report: &FinalReport) {
        let Some(sink) = &self.sink else {
            return;
        };
        if let Err(e) = sink.persist(report).await {
            warn!(session_id = %report.session_id, error = %e, "Report sink failed");
        }
    }
}

/// `"<phase> phase failed: <first line of cause>"`, capped at [`MAX_ERROR_LEN`]
pub fn failure_message(phase: Phase, err: &PhaseError) -> String {
    let text = err.to_string();
    let cause = text.lines().map(str::trim).find(|line| !line.is_empty()).unwrap_or("unknown error");
    let message = format!("{} phase failed: {}", phase, cause);
    if message.chars().count() <= MAX_ERROR_LEN {
        return message;
    }
    let mut capped: String = message.chars().take(MAX_ERROR_LEN - 3).collect();
    capped.push_str("...");
    capped
}
