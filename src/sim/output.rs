// Logging output ports: stand-ins for the speaker and the radar display

use crate::feedback::{FeedbackProfile, SoundCue, SoundPlayer, SoundRegistry, VisualPort};
use crate::{debug, info, trace};

/// Sound player that logs its commands instead of producing audio
#[derive(Debug)]
pub struct LoggingSoundPlayer {
    cue: SoundCue,
    playing: bool,
    volume: f32,
}

impl LoggingSoundPlayer {
    pub fn new(cue: SoundCue) -> Self {
        Self {
            cue,
            playing: false,
            volume: 1.0,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }
}

impl SoundPlayer for LoggingSoundPlayer {
    fn play(&mut self) {
        if self.cue.is_looping() {
            if !self.playing {
                info!("[sound] {} loop started (volume {:.2})", self.cue.name(), self.volume);
            }
            self.playing = true;
        } else {
            debug!("[sound] {}", self.cue.name());
        }
    }

    fn stop(&mut self) {
        if self.playing {
            info!("[sound] {} loop stopped", self.cue.name());
        }
        self.playing = false;
    }

    fn set_volume(&mut self, volume: f32) {
        if (volume - self.volume).abs() > f32::EPSILON {
            trace!("[sound] {} volume {:.2}", self.cue.name(), volume);
        }
        self.volume = volume;
    }
}

/// Registry with a logging player for every cue
pub fn logging_registry() -> SoundRegistry {
    let mut registry = SoundRegistry::new();
    for cue in SoundCue::ALL {
        registry.register(cue, Box::new(LoggingSoundPlayer::new(cue)));
    }
    registry
}

/// Visual port that logs what a radar display would draw
#[derive(Debug, Default)]
pub struct LoggingVisual {
    visible: bool,
    position: (f64, f64),
    gradient: Option<FeedbackProfile>,
}

impl LoggingVisual {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn position(&self) -> (f64, f64) {
        self.position
    }

    pub fn gradient(&self) -> Option<FeedbackProfile> {
        self.gradient
    }
}

impl VisualPort for LoggingVisual {
    fn set_position(&mut self, x: f64, y: f64) {
        self.position = (x, y);
        trace!("[radar] entity at ({:.1}, {:.1})", x, y);
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if visible {
            info!(
                "[radar] entity shown at ({:.1}, {:.1})",
                self.position.0, self.position.1
            );
        } else {
            info!("[radar] entity hidden");
        }
    }

    fn set_gradient(&mut self, profile: FeedbackProfile) {
        self.gradient = Some(profile);
        debug!("[radar] gradient {}", profile.name());
    }
}
