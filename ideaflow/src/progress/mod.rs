//! Progress reporting for running sessions
//!
//! Collaborators never touch the store directly. They receive a
//! [`ProgressReporter`] bound to their session and report sub-progress and
//! step records through it.

mod reporter;

pub use reporter::ProgressReporter;
