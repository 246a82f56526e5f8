//! Phase orchestration
//!
//! ```text
//!   SessionManager --spawn--> session task --> PhaseOrchestrator
//!                                                   |
//!        research -> ideation -> analysis -> report -> FinalReport
//!                       |                                  |
//!                RefinementLoop                      ReportSink
//! ```
//!
//! The [`SessionManager`] owns one task per session. Each task runs the
//! [`PhaseOrchestrator`], which calls the [`PhaseAgent`] for every phase in
//! order and writes all state changes through the session store.

mod engine;
mod ideation;
mod manager;
mod phase;
mod report;

pub use engine::{MAX_ERROR_LEN, PhaseOrchestrator, failure_message};
pub use ideation::IdeationPhase;
pub use manager::{INTERNAL_ERROR, ManagerError, SessionManager, SessionRequest};
pub use phase::{PhaseAgent, PhaseContext, PhaseError, PhaseOutput, PhasePipeline};
pub use report::{JsonReportSink, ReportSink};

#[cfg(test)]
pub use phase::mock;
