// Proximity events for the presentation layer
// Defines event payloads, the emission trait and a channel-backed emitter

use serde::Serialize;
use tokio::sync::broadcast;

use crate::audio::LevelSample;
use crate::audio_constants::EVENT_CHANNEL_BUFFER_SIZE;
use crate::feedback::FeedbackProfile;
use crate::proximity::{EncounterEvent, ProximitySnapshot};
use crate::warn;

/// Event names as constants for consistency
pub mod event_names {
    pub const LEVEL_SAMPLE: &str = "level-sample";
    pub const PROXIMITY_STATE: &str = "proximity-state";
    pub const POSITION: &str = "position";
    pub const ENCOUNTER: &str = "encounter";
    pub const FEEDBACK_PROFILE: &str = "feedback-profile";
}

/// Payload for position events
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PositionPayload {
    pub x: f64,
    pub y: f64,
    /// On-screen angle in radians (base angle plus heading change)
    pub angle: f64,
    pub distance: f64,
}

/// Payload for feedback_profile events
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackProfilePayload {
    /// Active profile (None once feedback is deactivated)
    pub profile: Option<FeedbackProfile>,
    /// Mid band loop volume, when Mid is active
    pub volume: Option<f32>,
}

/// Trait for emitting proximity events
/// Allows mocking in tests while using channels in production
pub trait ProximityEventEmitter: Send + Sync {
    /// Emit level-sample event (once per tick)
    fn emit_level_sample(&self, payload: LevelSample);

    /// Emit proximity-state event (once per tick)
    fn emit_proximity_state(&self, payload: ProximitySnapshot);

    /// Emit position event (whenever the derived position changes)
    fn emit_position(&self, payload: PositionPayload);

    /// Emit encounter event
    fn emit_encounter(&self, payload: EncounterEvent);

    /// Emit feedback-profile event (on profile changes)
    fn emit_feedback_profile(&self, payload: FeedbackProfilePayload);
}

/// Receiving end of one event stream
///
/// Delivery is FIFO per stream. A subscriber that falls more than the
/// channel capacity behind skips the oldest events (logged).
pub struct Subscription<T: Clone> {
    name: &'static str,
    rx: broadcast::Receiver<T>,
}

impl<T: Clone> Subscription<T> {
    /// Wait for the next event; None once the emitter is gone
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("[events] '{}' subscriber lagged, skipped {} events", self.name, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next event if one is already queued
    pub fn try_recv(&mut self) -> Option<T> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!("[events] '{}' subscriber lagged, skipped {} events", self.name, skipped);
                }
                Err(_) => return None,
            }
        }
    }

    /// Drain every queued event
    pub fn drain(&mut self) -> Vec<T> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// Stop receiving events
    pub fn unsubscribe(self) {
        drop(self);
    }
}

/// Emitter that fans events out over one broadcast channel per stream
pub struct ChannelEventEmitter {
    levels: broadcast::Sender<LevelSample>,
    states: broadcast::Sender<ProximitySnapshot>,
    positions: broadcast::Sender<PositionPayload>,
    encounters: broadcast::Sender<EncounterEvent>,
    feedback: broadcast::Sender<FeedbackProfilePayload>,
}

impl ChannelEventEmitter {
    pub fn new() -> Self {
        Self::with_capacity(EVENT_CHANNEL_BUFFER_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            levels: broadcast::channel(capacity).0,
            states: broadcast::channel(capacity).0,
            positions: broadcast::channel(capacity).0,
            encounters: broadcast::channel(capacity).0,
            feedback: broadcast::channel(capacity).0,
        }
    }

    pub fn subscribe_levels(&self) -> Subscription<LevelSample> {
        Subscription {
            name: event_names::LEVEL_SAMPLE,
            rx: self.levels.subscribe(),
        }
    }

    pub fn subscribe_states(&self) -> Subscription<ProximitySnapshot> {
        Subscription {
            name: event_names::PROXIMITY_STATE,
            rx: self.states.subscribe(),
        }
    }

    pub fn subscribe_positions(&self) -> Subscription<PositionPayload> {
        Subscription {
            name: event_names::POSITION,
            rx: self.positions.subscribe(),
        }
    }

    pub fn subscribe_encounters(&self) -> Subscription<EncounterEvent> {
        Subscription {
            name: event_names::ENCOUNTER,
            rx: self.encounters.subscribe(),
        }
    }

    pub fn subscribe_feedback(&self) -> Subscription<FeedbackProfilePayload> {
        Subscription {
            name: event_names::FEEDBACK_PROFILE,
            rx: self.feedback.subscribe(),
        }
    }
}

impl Default for ChannelEventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

/// Send to a broadcast channel; having no subscribers is not an error
fn send_or_ignore<T>(tx: &broadcast::Sender<T>, payload: T) {
    let _ = tx.send(payload);
}

impl ProximityEventEmitter for ChannelEventEmitter {
    fn emit_level_sample(&self, payload: LevelSample) {
        send_or_ignore(&self.levels, payload);
    }

    fn emit_proximity_state(&self, payload: ProximitySnapshot) {
        send_or_ignore(&self.states, payload);
    }

    fn emit_position(&self, payload: PositionPayload) {
        send_or_ignore(&self.positions, payload);
    }

    fn emit_encounter(&self, payload: EncounterEvent) {
        send_or_ignore(&self.encounters, payload);
    }

    fn emit_feedback_profile(&self, payload: FeedbackProfilePayload) {
        send_or_ignore(&self.feedback, payload);
    }
}

#[cfg(test)]
#[path = "events_test.rs"]
pub(crate) mod tests;
