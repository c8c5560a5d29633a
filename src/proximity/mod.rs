// Proximity module: silence-driven approach state machine and radar placement

mod controller;
pub mod position;
mod state;

pub use controller::{ControllerConfig, EncounterEvent, ProximityController, TickOutcome};
pub use position::{resolve_position, Perturbation, Position, PositionResolver};
pub use state::{ProximityPhase, ProximitySnapshot, ProximityState};
