// Session module: one proximity session from start to teardown
//
// The engine holds all state and is driven synchronously; the runner owns the
// tokio task that feeds it ticks and bearings.

pub mod engine;
mod runner;

pub use engine::{EnginePorts, EngineStart, ProximityEngine};
pub use runner::ProximitySession;

use crate::settings::SettingsError;

/// Errors from starting or stopping a session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session is already running")]
    AlreadyRunning,
    #[error("Session is not running")]
    NotRunning,
    /// Sessions are spawned onto the ambient tokio runtime
    #[error("No tokio runtime available to run the session")]
    NoRuntime,
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("Session task failed: {0}")]
    TaskFailed(String),
}
