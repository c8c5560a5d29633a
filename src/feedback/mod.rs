// Feedback module: distance bands, sound cue registry and visual port
//
// The selector owns the mutual-exclusion rules between profiles; the sound
// and visual ports only execute commands.

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::warn;

pub mod selector;
pub use selector::{FeedbackBandSelector, FeedbackBands};

/// Feedback configuration selected by distance; exactly one is active while
/// the entity is visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackProfile {
    Far,
    Mid,
    Near,
    Encounter,
}

impl FeedbackProfile {
    pub fn name(&self) -> &'static str {
        match self {
            FeedbackProfile::Far => "far",
            FeedbackProfile::Mid => "mid",
            FeedbackProfile::Near => "near",
            FeedbackProfile::Encounter => "encounter",
        }
    }
}

/// Named sound handles behind the Sound Output Port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundCue {
    /// Approach cadence one-shot
    Tap,
    /// Near band alert loop
    Alarm,
    /// Encounter stinger
    Alarm2,
    /// Far band low-alert loop
    Alarm3,
    /// Mid band ambient loop
    Whispers,
    /// Encounter scream
    PhantomScream,
}

impl SoundCue {
    pub const ALL: [SoundCue; 6] = [
        SoundCue::Tap,
        SoundCue::Alarm,
        SoundCue::Alarm2,
        SoundCue::Alarm3,
        SoundCue::Whispers,
        SoundCue::PhantomScream,
    ];

    /// Asset name of the cue (without extension)
    pub fn name(&self) -> &'static str {
        match self {
            SoundCue::Tap => "Tap",
            SoundCue::Alarm => "Alarm",
            SoundCue::Alarm2 => "Alarm2",
            SoundCue::Alarm3 => "Alarm3",
            SoundCue::Whispers => "Whispers",
            SoundCue::PhantomScream => "PhantomScream",
        }
    }

    /// Whether the cue is a continuous loop (as opposed to a one-shot)
    pub fn is_looping(&self) -> bool {
        matches!(self, SoundCue::Alarm | SoundCue::Alarm3 | SoundCue::Whispers)
    }
}

/// A single playable sound handle
pub trait SoundPlayer: Send {
    fn play(&mut self);
    fn stop(&mut self);
    /// Volume in [0, 1]
    fn set_volume(&mut self, volume: f32);
}

/// Visual Port: commands for the (externally rendered) entity and radar
pub trait VisualPort: Send {
    fn set_position(&mut self, x: f64, y: f64);
    fn set_visible(&mut self, visible: bool);
    fn set_gradient(&mut self, profile: FeedbackProfile);
}

/// Registry of sound players keyed by cue
///
/// Commands for unregistered cues are skipped; the first one per cue is
/// logged.
#[derive(Default)]
pub struct SoundRegistry {
    players: HashMap<SoundCue, Box<dyn SoundPlayer>>,
    warned_missing: HashSet<SoundCue>,
}

impl SoundRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the player for a cue
    pub fn register(&mut self, cue: SoundCue, player: Box<dyn SoundPlayer>) {
        self.players.insert(cue, player);
        self.warned_missing.remove(&cue);
    }

    pub fn contains(&self, cue: SoundCue) -> bool {
        self.players.contains_key(&cue)
    }

    pub fn play(&mut self, cue: SoundCue) {
        if let Some(player) = self.player(cue) {
            player.play();
        }
    }

    pub fn stop(&mut self, cue: SoundCue) {
        if let Some(player) = self.player(cue) {
            player.stop();
        }
    }

    pub fn set_volume(&mut self, cue: SoundCue, volume: f32) {
        if let Some(player) = self.player(cue) {
            player.set_volume(volume.clamp(0.0, 1.0));
        }
    }

    /// Stop every registered player
    pub fn stop_all(&mut self) {
        for player in self.players.values_mut() {
            player.stop();
        }
    }

    fn player(&mut self, cue: SoundCue) -> Option<&mut Box<dyn SoundPlayer>> {
        if !self.players.contains_key(&cue) {
            if self.warned_missing.insert(cue) {
                warn!("[feedback] No player registered for sound '{}'", cue.name());
            }
            return None;
        }
        self.players.get_mut(&cue)
    }
}

impl std::fmt::Debug for SoundRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut cues: Vec<&str> = self.players.keys().map(|c| c.name()).collect();
        cues.sort_unstable();
        f.debug_struct("SoundRegistry").field("cues", &cues).finish()
    }
}
