//! StateManager - actor that owns the session repository
//!
//! Every read and write goes through one FIFO command channel, so commands
//! touching the same session are applied in the order they were sent and a
//! reader only ever sees a state between two commands.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::domain::{FinalReport, Phase, SessionId, SessionStatus, StepRecord, WorkflowState};

use super::messages::{Reply, StateCommand, StateError, StateResponse};
use super::repository::{MemoryRepository, SessionRepository};

/// Command channel depth
const COMMAND_CHANNEL_CAPACITY: usize = 256;

/// Aggregated counts over all sessions in the store
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct SessionMetrics {
    pub total_sessions: u64,
    pub running: u64,
    pub completed: u64,
    pub failed: u64,
    /// Step records across all sessions
    pub total_steps: u64,
}

/// Handle to send commands to the StateManager
#[derive(Clone)]
pub struct StateManager {
    tx: mpsc::Sender<StateCommand>,
}

impl StateManager {
    /// Spawn a new StateManager actor over the given repository
    pub fn spawn<R: SessionRepository>(repository: R) -> Self {
        debug!("spawn: called");
        let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        tokio::spawn(actor_loop(repository, rx));
        info!("StateManager spawned");
        Self { tx }
    }

    /// Spawn over a fresh [`MemoryRepository`]
    pub fn spawn_in_memory() -> Self {
        Self::spawn(MemoryRepository::new())
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<StateResponse<T>>) -> StateCommand) -> StateResponse<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    /// Create a new session and return its ID
    ///
    /// `input` is trimmed; empty input or an empty `user_id` is rejected
    /// before anything is stored.
    pub async fn create(&self, user_id: &str, input: &str, requirements: Option<String>) -> StateResponse<SessionId> {
        debug!(%user_id, input_len = input.len(), "create: called");
        let input = input.trim();
        if input.is_empty() {
            debug!("create: empty input");
            return Err(StateError::InvalidInput("input text must not be empty".to_string()));
        }
        let user_id = user_id.trim();
        if user_id.is_empty() {
            debug!("create: empty user id");
            return Err(StateError::InvalidInput("user id must not be empty".to_string()));
        }

        let state = WorkflowState::new(SessionId::generate(), user_id, input).with_requirements(requirements);
        self.request(|reply| StateCommand::Create {
            state: Box::new(state),
            reply,
        })
        .await
    }

    /// Snapshot of one session
    pub async fn get(&self, session_id: &SessionId) -> StateResponse<WorkflowState> {
        debug!(%session_id, "get: called");
        self.request(|reply| StateCommand::Get {
            session_id: session_id.clone(),
            reply,
        })
        .await
    }

    /// Append a step and wait for the store to apply it
    pub async fn append_step(&self, session_id: &SessionId, step: StepRecord) -> StateResponse<()> {
        debug!(%session_id, agent = %step.agent, status = %step.status, "append_step: called");
        self.request(|reply| StateCommand::AppendStep {
            session_id: session_id.clone(),
            step,
            reply,
        })
        .await
    }

    /// Append the first step of an execution
    ///
    /// Fails with `InvalidPhase` if any step has already been recorded, so
    /// only one executor can ever own a session.
    pub async fn claim(&self, session_id: &SessionId, step: StepRecord) -> StateResponse<()> {
        debug!(%session_id, agent = %step.agent, "claim: called");
        self.request(|reply| StateCommand::Claim {
            session_id: session_id.clone(),
            step,
            reply,
        })
        .await
    }

    /// Move the session to `phase` at `percentage`
    pub async fn update_progress(&self, session_id: &SessionId, phase: Phase, percentage: u8) -> StateResponse<()> {
        debug!(%session_id, %phase, percentage, "update_progress: called");
        self.request(|reply| StateCommand::UpdateProgress {
            session_id: session_id.clone(),
            phase,
            percentage,
            reply: Some(reply),
        })
        .await
    }

    /// Non-blocking progress report; returns false if the channel is full
    /// or closed. Rejected updates are dropped by the actor.
    pub fn try_update_progress(&self, session_id: &SessionId, phase: Phase, percentage: u8) -> bool {
        debug!(%session_id, %phase, percentage, "try_update_progress: called");
        self.tx
            .try_send(StateCommand::UpdateProgress {
                session_id: session_id.clone(),
                phase,
                percentage,
                reply: None,
            })
            .is_ok()
    }

    /// Terminal success: phase completed, progress 100, report stored
    pub async fn mark_completed(&self, session_id: &SessionId, report: FinalReport) -> StateResponse<()> {
        debug!(%session_id, status = %report.status, "mark_completed: called");
        self.request(|reply| StateCommand::MarkCompleted {
            session_id: session_id.clone(),
            report: Box::new(report),
            reply,
        })
        .await
    }

    /// Terminal failure: progress and report are left as they are
    pub async fn mark_failed(&self, session_id: &SessionId, error: &str) -> StateResponse<()> {
        debug!(%session_id, %error, "mark_failed: called");
        self.request(|reply| StateCommand::MarkFailed {
            session_id: session_id.clone(),
            error: error.to_string(),
            reply,
        })
        .await
    }

    /// Snapshots of all sessions, optionally filtered by status
    pub async fn list(&self, status_filter: Option<SessionStatus>) -> StateResponse<Vec<WorkflowState>> {
        debug!(?status_filter, "list: called");
        self.request(|reply| StateCommand::List { status_filter, reply }).await
    }

    pub async fn metrics(&self) -> StateResponse<SessionMetrics> {
        debug!("metrics: called");
        self.request(|reply| StateCommand::Metrics { reply }).await
    }

    /// Stop the actor and close the repository
    pub async fn shutdown(&self) -> StateResponse<()> {
        debug!("shutdown: called");
        self.request(|reply| StateCommand::Shutdown { reply }).await
    }
}

fn load_required<R: SessionRepository>(repo: &R, session_id: &SessionId) -> StateResponse<WorkflowState> {
    repo.load(session_id)
        .map_err(|e| StateError::Repository(e.to_string()))?
        .ok_or_else(|| StateError::NotFound(session_id.to_string()))
}

fn save<R: SessionRepository>(repo: &mut R, state: WorkflowState) -> StateResponse<()> {
    repo.save(state).map_err(|e| StateError::Repository(e.to_string()))
}

/// Validate and apply a progress update in place
fn apply_progress(state: &mut WorkflowState, phase: Phase, percentage: u8) -> StateResponse<()> {
    if state.is_terminal() {
        return Err(StateError::Terminal(state.session_id.to_string()));
    }
    if !phase.is_executable() {
        return Err(StateError::InvalidPhase(format!(
            "{} cannot be set through a progress update",
            phase
        )));
    }
    if percentage > 100 {
        return Err(StateError::InvalidProgress(format!("{} is above 100", percentage)));
    }
    if phase < state.phase {
        return Err(StateError::InvalidPhase(format!(
            "cannot return to {} from {}",
            phase, state.phase
        )));
    }
    if phase > state.phase && Some(phase) != state.phase.next() {
        return Err(StateError::InvalidPhase(format!("cannot skip from {} to {}", state.phase, phase)));
    }
    if percentage < state.progress_percentage {
        return Err(StateError::InvalidProgress(format!(
            "{} is below current {}",
            percentage, state.progress_percentage
        )));
    }

    state.phase = phase;
    state.progress_percentage = percentage;
    state.touch();
    Ok(())
}

fn apply_step(state: &mut WorkflowState, step: StepRecord) -> StateResponse<()> {
    if state.is_terminal() {
        return Err(StateError::Terminal(state.session_id.to_string()));
    }
    state.steps.push(step);
    state.touch();
    Ok(())
}

fn respond<T>(reply: Reply<T>, result: StateResponse<T>, what: &str) {
    match reply {
        Some(reply) => {
            let _ = reply.send(result);
        }
        None => {
            if let Err(e) = result {
                debug!(error = %e, what, "actor_loop: dropping rejected fire-and-forget command");
            }
        }
    }
}

fn compute_metrics(sessions: &[WorkflowState]) -> SessionMetrics {
    let mut metrics = SessionMetrics::default();
    for session in sessions {
        metrics.total_sessions += 1;
        match session.status {
            SessionStatus::Running => metrics.running += 1,
            SessionStatus::Completed => metrics.completed += 1,
            SessionStatus::Failed => metrics.failed += 1,
        }
        metrics.total_steps += session.steps.len() as u64;
    }
    metrics
}

/// The actor loop that owns the repository and processes commands
async fn actor_loop<R: SessionRepository>(mut repo: R, mut rx: mpsc::Receiver<StateCommand>) {
    debug!("StateManager actor started");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            StateCommand::Create { state, reply } => {
                debug!(session_id = %state.session_id, "actor_loop: Create command");
                let session_id = state.session_id.clone();
                let result = match repo.load(&session_id) {
                    Ok(Some(_)) => Err(StateError::Repository(format!("duplicate session id {}", session_id))),
                    Ok(None) => save(&mut repo, *state).map(|_| session_id),
                    Err(e) => Err(StateError::Repository(e.to_string())),
                };
                let _ = reply.send(result);
            }

            StateCommand::Get { session_id, reply } => {
                debug!(%session_id, "actor_loop: Get command");
                let _ = reply.send(load_required(&repo, &session_id));
            }

            StateCommand::AppendStep {
                session_id,
                step,
                reply,
            } => {
                debug!(%session_id, agent = %step.agent, "actor_loop: AppendStep command");
                let result = load_required(&repo, &session_id).and_then(|mut state| {
                    apply_step(&mut state, step)?;
                    save(&mut repo, state)
                });
                let _ = reply.send(result);
            }

            StateCommand::Claim { session_id, step, reply } => {
                debug!(%session_id, agent = %step.agent, "actor_loop: Claim command");
                let result = load_required(&repo, &session_id).and_then(|mut state| {
                    if !state.steps.is_empty() {
                        return Err(StateError::InvalidPhase(format!(
                            "session {} has already been executed",
                            session_id
                        )));
                    }
                    apply_step(&mut state, step)?;
                    save(&mut repo, state)
                });
                let _ = reply.send(result);
            }

            StateCommand::UpdateProgress {
                session_id,
                phase,
                percentage,
                reply,
            } => {
                debug!(%session_id, %phase, percentage, "actor_loop: UpdateProgress command");
                let result = load_required(&repo, &session_id).and_then(|mut state| {
                    if state.phase == phase && state.progress_percentage == percentage && !state.is_terminal() {
                        return Ok(());
                    }
                    apply_progress(&mut state, phase, percentage)?;
                    save(&mut repo, state)
                });
                respond(reply, result, "update_progress");
            }

            StateCommand::MarkCompleted {
                session_id,
                report,
                reply,
            } => {
                debug!(%session_id, "actor_loop: MarkCompleted command");
                let result = load_required(&repo, &session_id).and_then(|mut state| {
                    if state.is_terminal() {
                        debug!(%session_id, status = %state.status, "actor_loop: MarkCompleted on terminal session, ignoring");
                        return Ok(());
                    }
                    state.status = SessionStatus::Completed;
                    state.phase = Phase::Completed;
                    state.progress_percentage = 100;
                    state.final_report = Some(*report);
                    state.touch();
                    save(&mut repo, state)
                });
                let _ = reply.send(result);
            }

            StateCommand::MarkFailed {
                session_id,
                error,
                reply,
            } => {
                debug!(%session_id, %error, "actor_loop: MarkFailed command");
                let result = load_required(&repo, &session_id).and_then(|mut state| {
                    if state.is_terminal() {
                        debug!(%session_id, status = %state.status, "actor_loop: MarkFailed on terminal session, ignoring");
                        return Ok(());
                    }
                    state.status = SessionStatus::Failed;
                    state.error = Some(error);
                    state.touch();
                    save(&mut repo, state)
                });
                let _ = reply.send(result);
            }

            StateCommand::List { status_filter, reply } => {
                debug!(?status_filter, "actor_loop: List command");
                let result = repo
                    .list()
                    .map_err(|e| StateError::Repository(e.to_string()))
                    .map(|all| match status_filter {
                        Some(status) => all.into_iter().filter(|s| s.status == status).collect(),
                        None => all,
                    });
                let _ = reply.send(result);
            }

            StateCommand::Metrics { reply } => {
                debug!("actor_loop: Metrics command");
                let result = repo
                    .list()
                    .map_err(|e| StateError::Repository(e.to_string()))
                    .map(|all| compute_metrics(&all));
                let _ = reply.send(result);
            }

            StateCommand::Shutdown { reply } => {
                info!("StateManager shutting down");
                let result = repo.close().map_err(|e| StateError::Repository(e.to_string()));
                let _ = reply.send(result);
                debug!("StateManager actor stopped");
                return;
            }
        }
    }

    if let Err(e) = repo.close() {
        warn!(error = %e, "StateManager: failed to close repository");
    }
    debug!("StateManager actor stopped (all handles dropped)");
}
