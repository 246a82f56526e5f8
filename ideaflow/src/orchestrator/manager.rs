//! SessionManager - owns the running sessions of a process
//!
//! The SessionManager is responsible for:
//! - Creating sessions and spawning one task per session
//! - Enforcing the concurrent-session limit via semaphore
//! - Per-session cancellation through child tokens of one root token
//! - Containing panics inside a session's task
//! - Graceful shutdown coordination

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use thiserror::Error;
use tokio::sync::{Mutex, Semaphore, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::{SessionId, StepRecord, WorkflowState};
use crate::events::{EventBus, WorkflowEvent};
use crate::state::{StateError, StateManager};

use super::engine::PhaseOrchestrator;

/// Error stored on a session whose task died unexpectedly
pub const INTERNAL_ERROR: &str = "internal error";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManagerError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error("Session manager is shutting down")]
    ShuttingDown,
}

/// A request to start one session
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub user_id: String,
    pub input: String,
    pub requirements: Option<String>,
}

impl SessionRequest {
    pub fn new(user_id: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            input: input.into(),
            requirements: None,
        }
    }

    pub fn with_requirements(mut self, requirements: impl Into<String>) -> Self {
        self.requirements = Some(requirements.into());
        self
    }
}

/// A session task and the token that cancels it
struct SessionTask {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

pub struct SessionManager {
    store: StateManager,
    bus: Arc<EventBus>,
    orchestrator: Arc<PhaseOrchestrator>,
    semaphore: Arc<Semaphore>,
    root: CancellationToken,
    tasks: Mutex<HashMap<SessionId, SessionTask>>,
    shutdown_timeout: Duration,
}

impl SessionManager {
    pub fn new(
        store: StateManager,
        bus: Arc<EventBus>,
        orchestrator: PhaseOrchestrator,
        max_concurrent_sessions: usize,
        shutdown_timeout: Duration,
    ) -> Self {
        debug!(max_concurrent_sessions, ?shutdown_timeout, "SessionManager::new: called");
        Self {
            store,
            bus,
            orchestrator: Arc::new(orchestrator),
            semaphore: Arc::new(Semaphore::new(max_concurrent_sessions.max(1))),
            root: CancellationToken::new(),
            tasks: Mutex::new(HashMap::new()),
            shutdown_timeout,
        }
    }

    pub fn store(&self) -> &StateManager {
        &self.store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.bus.subscribe()
    }

    /// Create a session and start running it in the background
    pub async fn start(&self, request: SessionRequest) -> Result<SessionId, ManagerError> {
        debug!(user_id = %request.user_id, "SessionManager::start: called");
        if self.root.is_cancelled() {
            return Err(ManagerError::ShuttingDown);
        }

        let session_id = self
            .store
            .create(&request.user_id, &request.input, request.requirements.clone())
            .await?;
        let input = request.input.trim().to_string();
        let user_id = request.user_id.trim().to_string();
        let emitter = self.bus.emitter_for(session_id.clone());
        emitter.session_created(&user_id, &input);
        info!(%session_id, %user_id, "Session created");

        let cancel = self.root.child_token();
        let handle = tokio::spawn(run_session(
            self.store.clone(),
            self.bus.clone(),
            self.orchestrator.clone(),
            self.semaphore.clone(),
            session_id.clone(),
            user_id,
            input,
            cancel.clone(),
        ));

        self.tasks.lock().await.insert(
            session_id.clone(),
            SessionTask {
                cancel,
                handle: Some(handle),
            },
        );
        Ok(session_id)
    }

    /// Cancel a running session; a finished session is left as it is
    pub async fn cancel(&self, session_id: &SessionId) -> Result<(), ManagerError> {
        debug!(%session_id, "SessionManager::cancel: called");
        let token = self.tasks.lock().await.get(session_id).map(|task| task.cancel.clone());
        match token {
            Some(token) => {
                token.cancel();
                info!(%session_id, "Session cancellation requested");
            }
            None => {
                // Joined sessions are no longer tracked but still stored
                self.store.get(session_id).await?;
                debug!(%session_id, "cancel: session already finished");
            }
        }
        Ok(())
    }

    /// Wait for a session's task to finish and return its final state
    ///
    /// The joined task is dropped from the manager; later calls read the
    /// stored state directly.
    pub async fn wait(&self, session_id: &SessionId) -> Result<WorkflowState, ManagerError> {
        debug!(%session_id, "SessionManager::wait: called");
        let handle = self
            .tasks
            .lock()
            .await
            .get_mut(session_id)
            .and_then(|task| task.handle.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(%session_id, error = %e, "wait: session task did not finish cleanly");
            }
            self.tasks.lock().await.remove(session_id);
        }
        Ok(self.store.get(session_id).await?)
    }

    /// Sessions the manager still holds a task entry for
    pub async fn tracked_count(&self) -> usize {
        self.tasks.lock().await.len()
    }

    /// Sessions whose task has not been awaited or finished yet
    pub async fn running_count(&self) -> usize {
        self.tasks
            .lock()
            .await
            .values()
            .filter(|task| task.handle.as_ref().is_some_and(|h| !h.is_finished()))
            .count()
    }

    /// Cancel everything, wait for the session tasks, stop the store
    pub async fn shutdown(&self) -> Result<(), ManagerError> {
        let handles: Vec<(SessionId, JoinHandle<()>)> = {
            let mut tasks = self.tasks.lock().await;
            tasks
                .iter_mut()
                .filter_map(|(id, task)| task.handle.take().map(|h| (id.clone(), h)))
                .collect()
        };
        info!("Shutting down SessionManager with {} active sessions", handles.len());
        self.root.cancel();

        let deadline = tokio::time::Instant::now() + self.shutdown_timeout;
        for (session_id, mut handle) in handles {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(%session_id, error = %e, "shutdown: session task failed"),
                Err(_) => {
                    warn!(%session_id, "Aborting session after shutdown timeout");
                    handle.abort();
                }
            }
        }

        self.tasks.lock().await.clear();
        self.store.shutdown().await?;
        info!("SessionManager shutdown complete");
        Ok(())
    }
}

/// Body of one session task
#[allow(clippy::too_many_arguments)]
async fn run_session(
    store: StateManager,
    bus: Arc<EventBus>,
    orchestrator: Arc<PhaseOrchestrator>,
    semaphore: Arc<Semaphore>,
    session_id: SessionId,
    user_id: String,
    input: String,
    cancel: CancellationToken,
) {
    debug!(%session_id, "run_session: waiting for permit");
    let permit = tokio::select! {
        _ = cancel.cancelled() => None,
        permit = semaphore.acquire_owned() => permit.ok(),
    };

    let inner = {
        let session_id = session_id.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            // A cancelled session still runs the orchestrator so the
            // cancellation is recorded as a phase failure
            orchestrator.execute_workflow(&session_id, &input, &user_id, cancel).await
        })
    };

    let failure = match inner.await {
        Ok(Ok(status)) => {
            debug!(%session_id, %status, "run_session: finished");
            None
        }
        Ok(Err(e)) => {
            error!(%session_id, error = %e, "Session aborted by store error");
            Some(e.to_string())
        }
        Err(e) => {
            error!(%session_id, error = %e, "Session task panicked");
            Some(e.to_string())
        }
    };
    drop(permit);

    if let Some(cause) = failure {
        record_internal_failure(&store, &bus, &session_id, &cause).await;
    }
}

/// Fail the phase a dead session task was in, then the session
async fn record_internal_failure(store: &StateManager, bus: &EventBus, session_id: &SessionId, cause: &str) {
    debug!(%session_id, %cause, "record_internal_failure: called");
    let state = match store.get(session_id).await {
        Ok(state) => state,
        Err(e) => {
            warn!(%session_id, error = %e, "record_internal_failure: could not load session");
            return;
        }
    };
    if state.is_terminal() {
        debug!(%session_id, status = %state.status, "record_internal_failure: already terminal");
        return;
    }

    let emitter = bus.emitter_for(session_id.clone());
    let phase = state.phase;
    let step = StepRecord::failed(phase.as_str(), INTERNAL_ERROR).with_details(json!({ "error": cause }));
    match store.append_step(session_id, step.clone()).await {
        Ok(()) => emitter.step_recorded(&step),
        Err(e) => warn!(%session_id, error = %e, "record_internal_failure: could not record failed step"),
    }
    emitter.phase_failed(phase, INTERNAL_ERROR);

    match store.mark_failed(session_id, INTERNAL_ERROR).await {
        Ok(()) => emitter.session_failed(INTERNAL_ERROR),
        Err(e) => warn!(%session_id, error = %e, "record_internal_failure: could not mark session failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Phase, SessionStatus, StepStatus};
    use crate::orchestrator::phase::PhasePipeline;
    use crate::orchestrator::phase::mock::{Behavior, MockAgent, pipeline_with};

    fn manager_with(pipeline: PhasePipeline, max_concurrent: usize) -> SessionManager {
        let store = StateManager::spawn_in_memory();
        let bus = Arc::new(EventBus::new(1024));
        let orchestrator = PhaseOrchestrator::new(store.clone(), bus.clone(), Arc::new(pipeline), Duration::from_secs(5));
        SessionManager::new(store, bus, orchestrator, max_concurrent, Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_start_creates_running_session() {
        let manager = manager_with(
            pipeline_with(vec![(Phase::Research, Behavior::Sleep(Duration::from_millis(300)))]),
            4,
        );
        let id = manager.start(SessionRequest::new("u1", "smart parking")).await.unwrap();

        let state = manager.store().get(&id).await.unwrap();
        assert_eq!(state.status, SessionStatus::Running);
        assert_eq!(state.phase, Phase::Research);
        assert_eq!(state.progress_percentage, 5);

        let done = manager.wait(&id).await.unwrap();
        assert_eq!(done.status, SessionStatus::Completed);
        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_start_rejects_blank_input() {
        let manager = manager_with(pipeline_with(vec![]), 4);
        let err = manager.start(SessionRequest::new("u1", "   ")).await.unwrap_err();
        assert!(matches!(err, ManagerError::State(StateError::InvalidInput(_))));
        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_panicking_agent_is_contained() {
        let manager = manager_with(
            pipeline_with(vec![(Phase::Analysis, Behavior::PanicOn("explode".to_string()))]),
            4,
        );
        let bad = manager.start(SessionRequest::new("u1", "explode")).await.unwrap();
        let good = manager.start(SessionRequest::new("u2", "urban farming")).await.unwrap();

        let bad_state = manager.wait(&bad).await.unwrap();
        assert_eq!(bad_state.status, SessionStatus::Failed);
        assert_eq!(bad_state.error.as_deref(), Some(INTERNAL_ERROR));
        assert!(bad_state.final_report.is_none());

        // The phase that died is closed with a failed step
        let last = bad_state.last_step().unwrap();
        assert_eq!(last.agent, "analysis");
        assert_eq!(last.status, StepStatus::Failed);
        assert_eq!(last.action, INTERNAL_ERROR);
        assert_eq!(bad_state.steps_for("analysis").filter(|s| s.is_failed()).count(), 1);

        let good_state = manager.wait(&good).await.unwrap();
        assert_eq!(good_state.status, SessionStatus::Completed);
        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_running_session() {
        let manager = manager_with(
            pipeline_with(vec![(Phase::Research, Behavior::Sleep(Duration::from_secs(10)))]),
            4,
        );
        let id = manager.start(SessionRequest::new("u1", "smart parking")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        manager.cancel(&id).await.unwrap();

        let state = tokio::time::timeout(Duration::from_secs(2), manager.wait(&id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.status, SessionStatus::Failed);
        assert_eq!(state.error.as_deref(), Some("research phase failed: Session cancelled"));
        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_releases_finished_task() {
        let manager = manager_with(pipeline_with(vec![]), 4);
        let id = manager.start(SessionRequest::new("u1", "smart parking")).await.unwrap();
        assert_eq!(manager.tracked_count().await, 1);

        let done = manager.wait(&id).await.unwrap();
        assert_eq!(done.status, SessionStatus::Completed);
        assert_eq!(manager.tracked_count().await, 0);

        // A joined session still answers from the store
        assert_eq!(manager.wait(&id).await.unwrap().status, SessionStatus::Completed);
        manager.cancel(&id).await.unwrap();
        assert_eq!(manager.store().get(&id).await.unwrap().status, SessionStatus::Completed);

        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_unknown_session() {
        let manager = manager_with(pipeline_with(vec![]), 4);
        let err = manager.cancel(&SessionId::from_string("nope")).await.unwrap_err();
        assert!(matches!(err, ManagerError::State(StateError::NotFound(_))));
        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_semaphore_limits_concurrency() {
        let agent = Arc::new(MockAgent::new("slow", Behavior::Sleep(Duration::from_millis(200))));
        let fast = Arc::new(MockAgent::new("fast", Behavior::Succeed));
        let pipeline = PhasePipeline::new(agent.clone(), fast.clone(), fast.clone(), fast);
        let manager = manager_with(pipeline, 1);

        let first = manager.start(SessionRequest::new("u1", "one")).await.unwrap();
        let second = manager.start(SessionRequest::new("u1", "two")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;

        // Only the permit holder has started its first phase
        assert_eq!(agent.calls(), 1);
        let waiting = manager.store().get(&second).await.unwrap();
        assert!(waiting.steps.is_empty());

        assert_eq!(manager.wait(&first).await.unwrap().status, SessionStatus::Completed);
        assert_eq!(manager.wait(&second).await.unwrap().status, SessionStatus::Completed);
        assert_eq!(agent.calls(), 2);
        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_cancels_sessions_and_rejects_new_ones() {
        let manager = manager_with(
            pipeline_with(vec![(Phase::Research, Behavior::Sleep(Duration::from_secs(10)))]),
            4,
        );
        let id = manager.start(SessionRequest::new("u1", "smart parking")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let store = manager.store().clone();

        let (tx, rx) = tokio::sync::oneshot::channel();
        let mut events = manager.subscribe();
        tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                if let WorkflowEvent::SessionFailed { session_id, error } = event {
                    let _ = tx.send((session_id, error));
                    break;
                }
            }
        });

        tokio::time::timeout(Duration::from_secs(3), manager.shutdown())
            .await
            .unwrap()
            .unwrap();
        let (failed_id, error) = rx.await.unwrap();
        assert_eq!(failed_id, id);
        assert_eq!(error, "research phase failed: Session cancelled");

        let err = manager.start(SessionRequest::new("u1", "late")).await.unwrap_err();
        assert_eq!(err, ManagerError::ShuttingDown);
        assert!(store.get(&id).await.is_err());
    }
}
