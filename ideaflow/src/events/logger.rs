//! Event Logger - persists events to JSONL files
//!
//! Subscribes to the EventBus and appends every event to
//! `<events-dir>/<session-id>/events.jsonl` for history and replay.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::bus::EventBus;
use super::types::{EventLogEntry, WorkflowEvent};

const EVENTS_FILE: &str = "events.jsonl";

/// Event logger that writes one JSONL file per session
pub struct EventLogger {
    events_dir: PathBuf,
    /// Open file writers per session
    writers: HashMap<String, BufWriter<File>>,
}

impl EventLogger {
    pub fn new(events_dir: impl AsRef<Path>) -> Self {
        let events_dir = events_dir.as_ref().to_path_buf();
        debug!(?events_dir, "EventLogger::new: creating logger");
        Self {
            events_dir,
            writers: HashMap::new(),
        }
    }

    /// Default events directory (`<data_local_dir>/ideaflow/sessions`)
    pub fn default_dir() -> eyre::Result<PathBuf> {
        let base = dirs::data_local_dir().ok_or_else(|| eyre::eyre!("Could not determine data directory"))?;
        Ok(base.join("ideaflow").join("sessions"))
    }

    /// Append an event to its session's log file
    pub fn write_event(&mut self, event: &WorkflowEvent) -> eyre::Result<()> {
        let session_id = event.session_id().as_str();
        debug!(%session_id, event_type = event.event_type(), "EventLogger::write_event");

        let writer = match self.writers.entry(session_id.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let session_dir = self.events_dir.join(session_id);
                fs::create_dir_all(&session_dir)?;

                let log_path = session_dir.join(EVENTS_FILE);
                debug!(?log_path, "EventLogger: creating new log file");
                let file = OpenOptions::new().create(true).append(true).open(&log_path)?;
                entry.insert(BufWriter::new(file))
            }
        };

        let entry = EventLogEntry::new(event.clone());
        let json = serde_json::to_string(&entry)?;
        writeln!(writer, "{}", json)?;
        writer.flush()?;

        Ok(())
    }

    /// Close the writer for a finished session
    pub fn close_session(&mut self, session_id: &str) {
        debug!(%session_id, "EventLogger::close_session");
        if let Some(mut writer) = self.writers.remove(session_id) {
            let _ = writer.flush();
        }
    }

    fn handle(&mut self, event: WorkflowEvent) {
        let session_id = event.session_id().to_string();
        if let Err(e) = self.write_event(&event) {
            error!(%session_id, error = %e, "EventLogger: failed to write event");
        }
        if event.is_terminal() {
            self.close_session(&session_id);
        }
    }

    /// Consume events until the bus closes or `shutdown` fires
    ///
    /// On shutdown, events already queued on the receiver are still written.
    pub async fn run(mut self, mut rx: broadcast::Receiver<WorkflowEvent>, shutdown: CancellationToken) {
        debug!("EventLogger::run: starting event logger");

        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Ok(event) => self.handle(event),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(missed = n, "EventLogger: lagged behind, missed events");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("EventLogger: channel closed, shutting down");
                        break;
                    }
                },
                _ = shutdown.cancelled() => {
                    debug!("EventLogger: shutdown requested, draining");
                    while let Ok(event) = rx.try_recv() {
                        self.handle(event);
                    }
                    break;
                }
            }
        }

        for (session_id, mut writer) in self.writers.drain() {
            debug!(%session_id, "EventLogger: flushing writer on shutdown");
            let _ = writer.flush();
        }
    }
}

/// Read back a session's event log
pub fn read_session_events(events_dir: impl AsRef<Path>, session_id: &str) -> eyre::Result<Vec<EventLogEntry>> {
    let log_path = events_dir.as_ref().join(session_id).join(EVENTS_FILE);
    debug!(?log_path, "read_session_events: reading log file");

    if !log_path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(&log_path)?;
    let mut entries = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<EventLogEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                warn!(line, error = %e, "read_session_events: failed to parse line");
            }
        }
    }

    debug!(count = entries.len(), "read_session_events: loaded entries");
    Ok(entries)
}

/// Spawn the event logger as a background task
///
/// The subscription is taken before spawning so no event emitted after this
/// call returns is missed.
pub fn spawn_event_logger(
    event_bus: &EventBus,
    events_dir: impl AsRef<Path>,
    shutdown: CancellationToken,
) -> eyre::Result<JoinHandle<()>> {
    let events_dir = events_dir.as_ref();
    fs::create_dir_all(events_dir)?;
    let logger = EventLogger::new(events_dir);
    let rx = event_bus.subscribe();
    Ok(tokio::spawn(async move {
        logger.run(rx, shutdown).await;
    }))
}
