// Feedback band selector: maps distance to exactly one feedback profile
//
// | distance        | profile   | continuous sound           |
// |-----------------|-----------|----------------------------|
// | == 0            | Encounter | none (scream + stinger)    |
// | < near edge     | Near      | Alarm loop                 |
// | [near, far)     | Mid       | Whispers loop, ramped vol  |
// | >= far edge     | Far       | Alarm3 loop                |

use super::{FeedbackProfile, SoundCue, SoundRegistry, VisualPort};
use crate::audio_constants::{FAR_BAND_EDGE, NEAR_BAND_EDGE};
use crate::{debug, trace};

/// Loops owned by the distance bands
const BAND_LOOPS: [SoundCue; 3] = [SoundCue::Alarm, SoundCue::Whispers, SoundCue::Alarm3];

/// One-shots owned by the encounter profile
const ENCOUNTER_EXTRAS: [SoundCue; 2] = [SoundCue::PhantomScream, SoundCue::Alarm2];

/// Band edges (distances)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedbackBands {
    /// Distances below this are Near (default: 45)
    pub near_edge: f64,
    /// Distances at or above this are Far (default: 95)
    pub far_edge: f64,
}

impl Default for FeedbackBands {
    fn default() -> Self {
        Self {
            near_edge: NEAR_BAND_EDGE as f64,
            far_edge: FAR_BAND_EDGE as f64,
        }
    }
}

impl FeedbackBands {
    /// Profile for a distance
    pub fn profile_for(&self, distance: f64) -> FeedbackProfile {
        if distance <= 0.0 {
            FeedbackProfile::Encounter
        } else if distance < self.near_edge {
            FeedbackProfile::Near
        } else if distance < self.far_edge {
            FeedbackProfile::Mid
        } else {
            FeedbackProfile::Far
        }
    }

    /// Mid band volume: `clamp(1 - distance / far_edge, 0, 1)`
    ///
    /// A non-positive far edge has no Mid band; the volume is then 0.
    pub fn mid_volume(&self, distance: f64) -> f32 {
        if self.far_edge <= 0.0 {
            return 0.0;
        }
        (1.0 - distance / self.far_edge).clamp(0.0, 1.0) as f32
    }
}

/// Selects and applies the feedback profile for the current distance
///
/// Switching profiles always stops the other profiles' loops before starting
/// the new one. Re-applying the active profile only refreshes the Mid volume.
#[derive(Debug, Default)]
pub struct FeedbackBandSelector {
    bands: FeedbackBands,
    active: Option<FeedbackProfile>,
    volume: Option<f32>,
}

impl FeedbackBandSelector {
    pub fn new(bands: FeedbackBands) -> Self {
        Self {
            bands,
            active: None,
            volume: None,
        }
    }

    pub fn bands(&self) -> &FeedbackBands {
        &self.bands
    }

    /// Active profile, if any
    pub fn active(&self) -> Option<FeedbackProfile> {
        self.active
    }

    /// Last volume applied to the Mid loop
    pub fn volume(&self) -> Option<f32> {
        self.volume
    }

    /// Apply the profile for `distance` to the sound and visual ports
    pub fn apply(
        &mut self,
        distance: f64,
        sounds: &mut SoundRegistry,
        visual: &mut dyn VisualPort,
    ) -> FeedbackProfile {
        let profile = self.bands.profile_for(distance);

        if self.active == Some(profile) {
            if profile == FeedbackProfile::Mid {
                self.set_mid_volume(distance, sounds);
            }
            trace!("[feedback] Profile {} unchanged at {:.1}", profile.name(), distance);
            return profile;
        }

        debug!(
            "[feedback] Profile {:?} -> {} at distance {:.1}",
            self.active.map(|p| p.name()),
            profile.name(),
            distance
        );

        match profile {
            FeedbackProfile::Encounter => {
                sounds.stop_all();
                for cue in ENCOUNTER_EXTRAS {
                    sounds.play(cue);
                }
            }
            FeedbackProfile::Near => {
                self.stop_loops_except(SoundCue::Alarm, sounds);
                sounds.play(SoundCue::Alarm);
            }
            FeedbackProfile::Mid => {
                self.stop_loops_except(SoundCue::Whispers, sounds);
                self.set_mid_volume(distance, sounds);
                sounds.play(SoundCue::Whispers);
            }
            FeedbackProfile::Far => {
                self.stop_loops_except(SoundCue::Alarm3, sounds);
                for cue in ENCOUNTER_EXTRAS {
                    sounds.stop(cue);
                }
                sounds.play(SoundCue::Alarm3);
            }
        }

        if profile != FeedbackProfile::Mid {
            self.volume = None;
        }
        visual.set_gradient(profile);
        self.active = Some(profile);
        profile
    }

    /// Approach cadence one-shot, played every approach tick in any band
    pub fn cadence(&self, sounds: &mut SoundRegistry) {
        sounds.play(SoundCue::Tap);
    }

    /// Stop every band loop and forget the active profile
    ///
    /// Encounter one-shots are left to finish.
    pub fn deactivate(&mut self, sounds: &mut SoundRegistry) {
        if self.active.is_none() {
            return;
        }
        debug!("[feedback] Deactivating profile {:?}", self.active.map(|p| p.name()));
        for cue in BAND_LOOPS {
            sounds.stop(cue);
        }
        self.active = None;
        self.volume = None;
    }

    fn stop_loops_except(&self, keep: SoundCue, sounds: &mut SoundRegistry) {
        for cue in BAND_LOOPS.into_iter().filter(|c| *c != keep) {
            sounds.stop(cue);
        }
    }

    fn set_mid_volume(&mut self, distance: f64, sounds: &mut SoundRegistry) {
        let volume = self.bands.mid_volume(distance);
        sounds.set_volume(SoundCue::Whispers, volume);
        self.volume = Some(volume);
    }
}

#[cfg(test)]
#[path = "selector_test.rs"]
pub(crate) mod tests;
