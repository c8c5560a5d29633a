// Simulated collaborators for the demo binary and integration-style tests

pub mod compass;
pub mod microphone;
pub mod output;

pub use compass::SimulatedCompass;
pub use microphone::{LevelScript, ScriptPhase, SimulatedMicrophone};
pub use output::{logging_registry, LoggingSoundPlayer, LoggingVisual};
