// Proximity engine: the single scheduling context of a session
//
// Owns every collaborator and applies one tick (or one bearing) at a time.
// Nothing here blocks or awaits; the runner decides when to call in.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::audio::{AudioInputPort, AudioLevelMonitor};
use crate::events::{FeedbackProfilePayload, PositionPayload, ProximityEventEmitter};
use crate::feedback::{FeedbackBandSelector, FeedbackProfile, SoundRegistry, VisualPort};
use crate::heading::{heading_channel, HeadingPort, HeadingReceiver, HeadingTracker};
use crate::proximity::{
    PositionResolver, ProximityController, ProximityPhase, ProximitySnapshot, TickOutcome,
};
use crate::settings::ProximitySettings;
use crate::{debug, info, warn};

/// External collaborators handed to a session
pub struct EnginePorts {
    pub audio: Box<dyn AudioInputPort>,
    /// None when the platform has no compass at all
    pub heading: Option<Box<dyn HeadingPort>>,
    pub sounds: SoundRegistry,
    pub visual: Box<dyn VisualPort>,
}

/// Heading subscription that unsubscribes when dropped
struct HeadingSubscription {
    port: Box<dyn HeadingPort>,
    active: bool,
}

impl HeadingSubscription {
    fn release(&mut self) {
        if self.active {
            self.port.unsubscribe();
            self.active = false;
            debug!("[heading] Unsubscribed from heading updates");
        }
    }
}

impl Drop for HeadingSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

/// Result of starting the engine's inputs
#[derive(Debug)]
pub struct EngineStart {
    /// Device sample rate, None when no microphone could be started
    pub sample_rate: Option<u32>,
    /// Bearing events for `on_bearing`; yields nothing without a compass
    pub headings: HeadingReceiver,
}

/// Wires the level monitor, proximity controller, heading tracker, position
/// resolver and feedback selector together
pub struct ProximityEngine {
    settings: ProximitySettings,
    monitor: AudioLevelMonitor,
    controller: ProximityController,
    tracker: HeadingTracker,
    resolver: PositionResolver,
    selector: FeedbackBandSelector,
    sounds: SoundRegistry,
    visual: Box<dyn VisualPort>,
    emitter: Arc<dyn ProximityEventEmitter>,
    heading_port: Option<Box<dyn HeadingPort>>,
    heading: Option<HeadingSubscription>,
    /// Last visibility sent to the visual port
    shown: Option<bool>,
    /// Last feedback state published
    feedback: FeedbackProfilePayload,
    ticks: u64,
}

impl ProximityEngine {
    /// Create an engine with an entropy-seeded RNG for approach angles
    pub fn new(
        settings: ProximitySettings,
        ports: EnginePorts,
        emitter: Arc<dyn ProximityEventEmitter>,
    ) -> Self {
        Self::with_rng(settings, ports, emitter, StdRng::from_entropy())
    }

    /// Create an engine with an explicit RNG
    pub fn with_rng(
        settings: ProximitySettings,
        ports: EnginePorts,
        emitter: Arc<dyn ProximityEventEmitter>,
        rng: StdRng,
    ) -> Self {
        let monitor = AudioLevelMonitor::new(ports.audio, settings.accumulator_capacity);
        let controller = ProximityController::with_rng(settings.controller_config(), rng);
        let perturbation = controller.perturbation();
        let resolver = PositionResolver::new(perturbation.base_angle, perturbation.distance);
        let selector = FeedbackBandSelector::new(settings.bands());

        Self {
            monitor,
            controller,
            tracker: HeadingTracker::new(),
            resolver,
            selector,
            sounds: ports.sounds,
            visual: ports.visual,
            emitter,
            heading_port: ports.heading,
            heading: None,
            shown: None,
            feedback: FeedbackProfilePayload {
                profile: None,
                volume: None,
            },
            ticks: 0,
            settings,
        }
    }

    /// Start audio capture and subscribe to heading updates
    ///
    /// Neither failure is fatal: without a microphone no sample is ever
    /// produced, without a compass the heading change stays 0.
    pub fn start(&mut self) -> EngineStart {
        let sample_rate = match self.monitor.start() {
            Ok(rate) => Some(rate),
            Err(e) => {
                warn!("[session] Audio capture unavailable, continuing without it: {}", e);
                None
            }
        };

        let (sender, headings) = heading_channel(self.settings.heading_channel_capacity);
        match self.heading_port.take() {
            Some(mut port) if port.is_available() => match port.subscribe(sender) {
                Ok(()) => {
                    debug!("[heading] Subscribed to heading updates");
                    self.heading = Some(HeadingSubscription { port, active: true });
                }
                Err(e) => {
                    warn!("[heading] Heading subscription failed: {}", e);
                    self.heading = Some(HeadingSubscription { port, active: false });
                }
            },
            Some(port) => {
                warn!("[heading] Heading updates not available, heading change stays 0");
                self.heading = Some(HeadingSubscription { port, active: false });
            }
            None => warn!("[heading] No heading port, heading change stays 0"),
        }

        info!(
            "[session] Engine started (threshold={} dB, tick={} ms)",
            self.controller.threshold(),
            self.settings.tick_interval_ms
        );
        EngineStart {
            sample_rate,
            headings,
        }
    }

    /// Close one aggregation interval and apply it everywhere
    ///
    /// Returns None when the monitor had no sample to emit.
    pub fn on_tick(&mut self) -> Option<TickOutcome> {
        let sample = self.monitor.tick()?;
        self.ticks += 1;
        self.emitter.emit_level_sample(sample);

        let outcome = self.controller.on_level_sample(&sample);
        debug!(
            "[session] tick {} avg={:.1} dB silence_ticks={} distance={:.1}",
            self.ticks, sample.average_db, outcome.silence_ticks, outcome.distance
        );

        if outcome.phase_changed() {
            info!(
                "[session] Phase {:?} -> {:?}",
                outcome.previous_phase, outcome.phase
            );
            self.apply_threshold_preset(outcome.phase);
        }

        let mut moved = false;
        if let Some(angle) = outcome.relocated {
            self.tracker.relatch();
            moved |= self.resolver.set_base_angle(angle).is_some();
            moved |= self
                .resolver
                .set_heading_change(self.tracker.heading_change())
                .is_some();
        }
        moved |= self.resolver.set_distance(outcome.distance).is_some();
        if moved {
            self.publish_position();
        }

        self.set_shown(outcome.visible || outcome.encounter.is_some());

        if let Some(event) = &outcome.encounter {
            self.selector.apply(0.0, &mut self.sounds, self.visual.as_mut());
            self.emitter.emit_encounter(event.clone());
        } else if outcome.visible {
            self.selector
                .apply(outcome.distance, &mut self.sounds, self.visual.as_mut());
            self.selector.cadence(&mut self.sounds);
        } else {
            self.selector.deactivate(&mut self.sounds);
        }
        self.publish_feedback();

        self.emitter.emit_proximity_state(self.controller.snapshot());
        Some(outcome)
    }

    /// Apply one bearing event (degrees)
    pub fn on_bearing(&mut self, bearing_degrees: f64) {
        let change = self.tracker.on_bearing(bearing_degrees);
        if self.resolver.set_heading_change(change).is_some() {
            self.publish_position();
        }
    }

    /// Change the operating threshold (dBFS)
    pub fn set_threshold(&mut self, threshold_db: f32) {
        self.settings.threshold_db = threshold_db;
        self.settings.idle_threshold_db = None;
        self.settings.active_threshold_db = None;
        self.controller.set_threshold(threshold_db);
    }

    fn apply_threshold_preset(&mut self, phase: ProximityPhase) {
        let threshold = match phase {
            ProximityPhase::Approaching => self.settings.threshold_for(true),
            ProximityPhase::Idle => self.settings.threshold_for(false),
            ProximityPhase::Encounter => return,
        };
        if threshold != self.controller.operating_threshold() {
            debug!("[session] Threshold preset {} dB for {:?}", threshold, phase);
            self.controller.set_threshold(threshold);
        }
    }

    fn publish_position(&mut self) {
        let position = self.resolver.position();
        self.visual.set_position(position.x, position.y);
        self.emitter.emit_position(PositionPayload {
            x: position.x,
            y: position.y,
            angle: self.resolver.angle(),
            distance: self.controller.state().distance,
        });
    }

    fn set_shown(&mut self, visible: bool) {
        if self.shown != Some(visible) {
            self.visual.set_visible(visible);
            self.shown = Some(visible);
        }
    }

    fn publish_feedback(&mut self) {
        let payload = FeedbackProfilePayload {
            profile: self.selector.active(),
            volume: self.selector.volume(),
        };
        if payload != self.feedback {
            self.feedback = payload;
            self.emitter.emit_feedback_profile(payload);
        }
    }

    /// Release the capture tap, the heading subscription and all sounds.
    /// Idempotent.
    pub fn shutdown(&mut self) {
        self.selector.deactivate(&mut self.sounds);
        self.sounds.stop_all();
        if let Some(mut heading) = self.heading.take() {
            heading.release();
        }
        self.monitor.shutdown();
    }

    pub fn snapshot(&self) -> ProximitySnapshot {
        self.controller.snapshot()
    }

    pub fn controller(&self) -> &ProximityController {
        &self.controller
    }

    pub fn tracker(&self) -> &HeadingTracker {
        &self.tracker
    }

    pub fn resolver(&self) -> &PositionResolver {
        &self.resolver
    }

    /// Active feedback profile, if any
    pub fn feedback_profile(&self) -> Option<FeedbackProfile> {
        self.selector.active()
    }

    pub fn settings(&self) -> &ProximitySettings {
        &self.settings
    }

    /// Ticks that produced a sample
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl Drop for ProximityEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
pub(crate) mod tests;
