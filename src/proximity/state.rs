// Proximity state owned by the controller

use serde::Serialize;

/// Phase of the proximity state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProximityPhase {
    /// Entity hidden, silence (maybe) accruing
    #[default]
    Idle,
    /// Entity visible and closing in
    Approaching,
    /// Distance reached zero; cooldown in progress
    Encounter,
}

/// Mutable state of the proximity state machine
///
/// Only the controller mutates this, and only on tick boundaries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityState {
    /// Simulated radar distance, within [0, max distance]
    pub distance: f64,
    /// Whether the entity is currently shown
    pub visible: bool,
    /// Whether the entity has ever been shown this session
    pub ever_shown: bool,
    /// Whether the current approach cycle has placed the entity
    pub position_set: bool,
    /// Consecutive ticks whose average was below the threshold
    pub silence_ticks: u32,
    /// Threshold currently in force (dBFS)
    pub threshold: f32,
}

impl ProximityState {
    pub fn new(max_distance: f64, threshold: f32) -> Self {
        Self {
            distance: max_distance,
            visible: false,
            ever_shown: false,
            position_set: false,
            silence_ticks: 0,
            threshold,
        }
    }
}

/// Read-only view of the controller published to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximitySnapshot {
    pub phase: ProximityPhase,
    pub distance: f64,
    pub visible: bool,
    pub silence_ticks: u32,
    pub threshold: f32,
}

impl ProximitySnapshot {
    pub fn from_state(phase: ProximityPhase, state: &ProximityState) -> Self {
        Self {
            phase,
            distance: state.distance,
            visible: state.visible,
            silence_ticks: state.silence_ticks,
            threshold: state.threshold,
        }
    }
}
