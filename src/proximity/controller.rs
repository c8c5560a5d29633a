// Proximity controller: the hysteretic silence-accrual state machine
//
// Consumes one LevelSample per tick. Enough consecutive silent ticks make the
// entity visible and every further silent tick brings it closer. Any loud
// tick hides it again. Reaching zero distance fires a single encounter and
// restarts the hysteresis from a clean slate.

use super::position::{random_angle, Perturbation};
use super::state::{ProximityPhase, ProximitySnapshot, ProximityState};
use crate::audio::LevelSample;
use crate::audio_constants::{
    APPROACH_STEP, COOLDOWN_THRESHOLD_DB, DEFAULT_COOLDOWN_TICKS, DEFAULT_THRESHOLD_DB,
    MAX_DISTANCE, SILENCE_TICKS_TO_SHOW,
};
use crate::{debug, info, trace};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

/// Configuration for the proximity state machine
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// Operating loudness threshold in dBFS (default: -30)
    pub threshold_db: f32,
    /// Unreachable threshold held during the encounter cooldown (default: -1000)
    pub cooldown_threshold_db: f32,
    /// Ticks spent in cooldown after an encounter (default: 0, same tick)
    pub cooldown_ticks: u32,
    /// Silent ticks before the entity appears (default: 15)
    pub silence_ticks_to_show: u32,
    /// Distance closed per silent tick while approaching (default: 5)
    pub approach_step: f64,
    /// Starting distance of every approach cycle (default: 190)
    pub max_distance: f64,
    /// Angle of the first appearance in radians (None = random)
    pub initial_angle: Option<f64>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            threshold_db: DEFAULT_THRESHOLD_DB,
            cooldown_threshold_db: COOLDOWN_THRESHOLD_DB,
            cooldown_ticks: DEFAULT_COOLDOWN_TICKS,
            silence_ticks_to_show: SILENCE_TICKS_TO_SHOW,
            approach_step: APPROACH_STEP as f64,
            max_distance: MAX_DISTANCE as f64,
            initial_angle: None,
        }
    }
}

/// Terminal event fired when the entity reaches the radar centre
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncounterEvent {
    /// 1-based count of encounters this session
    pub sequence: u64,
    /// Approach angle of the cycle that ended (radians)
    pub angle: f64,
    /// When the encounter happened
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// What a single tick changed
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub previous_phase: ProximityPhase,
    pub phase: ProximityPhase,
    pub visible: bool,
    pub distance: f64,
    pub silence_ticks: u32,
    /// Set when this tick rolled a new approach angle (radians)
    pub relocated: Option<f64>,
    /// Set on the tick the distance reached zero
    pub encounter: Option<EncounterEvent>,
}

impl TickOutcome {
    /// Whether the phase changed this tick
    pub fn phase_changed(&self) -> bool {
        self.previous_phase != self.phase
    }
}

/// Hysteretic proximity state machine
///
/// Single-threaded: every method is called from the session's scheduling
/// context.
pub struct ProximityController {
    config: ControllerConfig,
    state: ProximityState,
    phase: ProximityPhase,
    perturbation: Perturbation,
    /// Threshold restored when the cooldown ends
    operating_threshold: f32,
    cooldown_remaining: u32,
    encounters: u64,
    rng: StdRng,
}

impl ProximityController {
    /// Create a controller with default configuration
    pub fn new() -> Self {
        Self::with_config(ControllerConfig::default())
    }

    /// Create a controller with custom configuration and an entropy-seeded RNG
    pub fn with_config(config: ControllerConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create a controller with an explicit RNG for angle re-rolls
    pub fn with_rng(config: ControllerConfig, mut rng: StdRng) -> Self {
        let perturbation = Perturbation::new(config.initial_angle, config.max_distance, &mut rng);
        debug!(
            "[proximity] Controller created (threshold={} dB, angle={:.3} rad)",
            config.threshold_db, perturbation.base_angle
        );
        Self {
            state: ProximityState::new(config.max_distance, config.threshold_db),
            phase: ProximityPhase::Idle,
            perturbation,
            operating_threshold: config.threshold_db,
            cooldown_remaining: 0,
            encounters: 0,
            rng,
            config,
        }
    }

    /// Advance the state machine by one averaged loudness sample
    pub fn on_level_sample(&mut self, sample: &LevelSample) -> TickOutcome {
        let previous_phase = self.phase;

        if self.phase == ProximityPhase::Encounter {
            self.cooldown_tick();
            return self.outcome(previous_phase, None, None);
        }

        if sample.average_db < self.state.threshold {
            self.state.silence_ticks = self.state.silence_ticks.saturating_add(1);
        } else {
            if self.state.silence_ticks > 0 || self.phase != ProximityPhase::Idle {
                debug!(
                    "[proximity] Sound at {:.1} dB (threshold {:.1}), silence reset",
                    sample.average_db, self.state.threshold
                );
            }
            self.state.silence_ticks = 0;
            self.state.position_set = false;
            self.phase = ProximityPhase::Idle;
            self.state.visible = false;
        }

        let mut relocated = None;
        let mut encounter = None;

        if self.state.silence_ticks >= self.config.silence_ticks_to_show {
            if !self.state.ever_shown {
                // First appearance keeps its pre-assigned angle
                info!(
                    "[proximity] Entity appears for the first time at {:.3} rad",
                    self.perturbation.base_angle
                );
                self.state.ever_shown = true;
                self.state.position_set = true;
            } else if !self.state.position_set {
                let angle = random_angle(&mut self.rng);
                info!("[proximity] New approach from {:.3} rad", angle);
                self.perturbation.base_angle = angle;
                self.state.distance = self.config.max_distance;
                self.state.position_set = true;
                relocated = Some(angle);
            }

            self.phase = ProximityPhase::Approaching;
            self.state.visible = true;

            let before = self.state.distance;
            self.state.distance = (self.state.distance - self.config.approach_step).max(0.0);
            self.perturbation.distance = self.state.distance;

            if before > 0.0 && self.state.distance == 0.0 {
                encounter = Some(self.begin_encounter());
            }
        } else {
            self.state.visible = false;
        }

        trace!(
            "[proximity] avg={:.1} dB silence_ticks={} distance={:.1} phase={:?}",
            sample.average_db,
            self.state.silence_ticks,
            self.state.distance,
            self.phase
        );

        self.outcome(previous_phase, relocated, encounter)
    }

    /// Fire the encounter and enter cooldown
    fn begin_encounter(&mut self) -> EncounterEvent {
        self.encounters += 1;
        let event = EncounterEvent {
            sequence: self.encounters,
            angle: self.perturbation.base_angle,
            timestamp: chrono::Utc::now(),
        };
        info!("[proximity] ENCOUNTER #{} at {:.3} rad", event.sequence, event.angle);

        self.state.threshold = self.config.cooldown_threshold_db;
        self.state.silence_ticks = 0;
        self.state.position_set = false;
        self.state.visible = false;
        self.phase = ProximityPhase::Encounter;
        self.cooldown_remaining = self.config.cooldown_ticks;

        if self.cooldown_remaining == 0 {
            self.finish_cooldown();
        }
        event
    }

    /// One tick spent in cooldown: nothing accrues
    fn cooldown_tick(&mut self) {
        self.state.silence_ticks = 0;
        self.state.position_set = false;
        self.state.visible = false;
        self.cooldown_remaining = self.cooldown_remaining.saturating_sub(1);
        if self.cooldown_remaining == 0 {
            self.finish_cooldown();
        }
    }

    fn finish_cooldown(&mut self) {
        self.state.threshold = self.operating_threshold;
        self.state.visible = false;
        self.phase = ProximityPhase::Idle;
        debug!(
            "[proximity] Cooldown finished, threshold restored to {} dB",
            self.operating_threshold
        );
    }

    fn outcome(
        &self,
        previous_phase: ProximityPhase,
        relocated: Option<f64>,
        encounter: Option<EncounterEvent>,
    ) -> TickOutcome {
        TickOutcome {
            previous_phase,
            phase: self.phase,
            visible: self.state.visible,
            distance: self.state.distance,
            silence_ticks: self.state.silence_ticks,
            relocated,
            encounter,
        }
    }

    /// Set the operating threshold (dBFS)
    ///
    /// During a cooldown the unreachable threshold stays in force and the new
    /// value takes effect when the cooldown ends.
    pub fn set_threshold(&mut self, threshold_db: f32) {
        self.operating_threshold = threshold_db;
        if self.phase != ProximityPhase::Encounter {
            self.state.threshold = threshold_db;
        }
    }

    /// Threshold currently in force
    pub fn threshold(&self) -> f32 {
        self.state.threshold
    }

    /// Threshold that applies outside of a cooldown
    pub fn operating_threshold(&self) -> f32 {
        self.operating_threshold
    }

    pub fn phase(&self) -> ProximityPhase {
        self.phase
    }

    pub fn state(&self) -> &ProximityState {
        &self.state
    }

    pub fn perturbation(&self) -> &Perturbation {
        &self.perturbation
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Number of encounters fired so far
    pub fn encounters(&self) -> u64 {
        self.encounters
    }

    pub fn snapshot(&self) -> ProximitySnapshot {
        ProximitySnapshot::from_state(self.phase, &self.state)
    }
}

impl Default for ProximityController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
