//! Event bus for live observability
//!
//! Every session lifecycle change, phase boundary, progress report and step
//! append is emitted as a [`WorkflowEvent`] on a tokio broadcast channel.
//! Consumers subscribe; the bundled [`EventLogger`] writes one JSONL file per
//! session.
//!
//! ```text
//!   PhaseOrchestrator   ProgressReporter   RefinementLoop
//!          |                   |                 |
//!          +---------> EventBus (broadcast) <----+
//!                              |
//!                 +------------+------------+
//!                 |                         |
//!           EventLogger (.jsonl)      CLI / observers
//! ```
//!
//! Events are informational. The session store, not the bus, is the source
//! of truth for session state.

mod bus;
mod logger;
mod types;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, EventEmitter, create_event_bus};
pub use logger::{EventLogger, read_session_events, spawn_event_logger};
pub use types::{EventLogEntry, WorkflowEvent};
