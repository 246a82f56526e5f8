//! Session store with actor pattern
//!
//! StateManager owns a [`SessionRepository`] and processes commands over a
//! channel, giving every session a single serialized writer.

mod manager;
mod messages;
mod repository;

pub use manager::{SessionMetrics, StateManager};
pub use messages::{Reply, StateCommand, StateError, StateResponse};
pub use repository::{MemoryRepository, SessionRepository};
