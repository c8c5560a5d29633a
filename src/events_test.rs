use super::*;
use crate::proximity::ProximityPhase;
use std::sync::{Arc, Mutex};

/// Mock emitter that records all emitted events for testing
#[derive(Default, Clone)]
pub struct MockEventEmitter {
    pub level_events: Arc<Mutex<Vec<LevelSample>>>,
    pub state_events: Arc<Mutex<Vec<ProximitySnapshot>>>,
    pub position_events: Arc<Mutex<Vec<PositionPayload>>>,
    pub encounter_events: Arc<Mutex<Vec<EncounterEvent>>>,
    pub feedback_events: Arc<Mutex<Vec<FeedbackProfilePayload>>>,
}

impl MockEventEmitter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProximityEventEmitter for MockEventEmitter {
    fn emit_level_sample(&self, payload: LevelSample) {
        self.level_events.lock().unwrap().push(payload);
    }

    fn emit_proximity_state(&self, payload: ProximitySnapshot) {
        self.state_events.lock().unwrap().push(payload);
    }

    fn emit_position(&self, payload: PositionPayload) {
        self.position_events.lock().unwrap().push(payload);
    }

    fn emit_encounter(&self, payload: EncounterEvent) {
        self.encounter_events.lock().unwrap().push(payload);
    }

    fn emit_feedback_profile(&self, payload: FeedbackProfilePayload) {
        self.feedback_events.lock().unwrap().push(payload);
    }
}

fn snapshot(distance: f64) -> ProximitySnapshot {
    ProximitySnapshot {
        phase: ProximityPhase::Approaching,
        distance,
        visible: true,
        silence_ticks: 15,
        threshold: -30.0,
    }
}

#[test]
fn test_mock_emitter_records_events() {
    let emitter = MockEventEmitter::new();
    emitter.emit_level_sample(LevelSample::now(-45.0));
    emitter.emit_proximity_state(snapshot(185.0));

    assert_eq!(emitter.level_events.lock().unwrap().len(), 1);
    assert_eq!(emitter.state_events.lock().unwrap()[0].distance, 185.0);
}

#[test]
fn test_channel_emitter_without_subscribers_does_not_fail() {
    let emitter = ChannelEventEmitter::new();
    emitter.emit_level_sample(LevelSample::now(-45.0));
    emitter.emit_position(PositionPayload {
        x: 1.0,
        y: 0.0,
        angle: 0.0,
        distance: 1.0,
    });
}

#[test]
fn test_channel_emitter_delivers_fifo_per_stream() {
    let emitter = ChannelEventEmitter::new();
    let mut states = emitter.subscribe_states();
    let mut levels = emitter.subscribe_levels();

    for distance in [185.0, 180.0, 175.0] {
        emitter.emit_proximity_state(snapshot(distance));
    }
    emitter.emit_level_sample(LevelSample::now(-50.0));

    let distances: Vec<f64> = states.drain().iter().map(|s| s.distance).collect();
    assert_eq!(distances, vec![185.0, 180.0, 175.0]);
    assert_eq!(levels.drain().len(), 1);
}

#[test]
fn test_subscription_only_sees_later_events() {
    let emitter = ChannelEventEmitter::new();
    emitter.emit_proximity_state(snapshot(190.0));
    let mut states = emitter.subscribe_states();
    assert!(states.try_recv().is_none());
}

#[test]
fn test_lagging_subscriber_skips_oldest() {
    let emitter = ChannelEventEmitter::with_capacity(2);
    let mut states = emitter.subscribe_states();
    for distance in [185.0, 180.0, 175.0, 170.0] {
        emitter.emit_proximity_state(snapshot(distance));
    }
    let distances: Vec<f64> = states.drain().iter().map(|s| s.distance).collect();
    assert_eq!(distances, vec![175.0, 170.0]);
}

#[test]
fn test_unsubscribe_releases_receiver() {
    let emitter = ChannelEventEmitter::new();
    let states = emitter.subscribe_states();
    assert_eq!(emitter.states.receiver_count(), 1);
    states.unsubscribe();
    assert_eq!(emitter.states.receiver_count(), 0);
}

#[tokio::test]
async fn test_recv_returns_none_after_emitter_dropped() {
    let emitter = ChannelEventEmitter::new();
    let mut encounters = emitter.subscribe_encounters();
    drop(emitter);
    assert!(encounters.recv().await.is_none());
}

#[test]
fn test_payloads_serialize_camel_case() {
    let json = serde_json::to_value(snapshot(185.0)).unwrap();
    assert_eq!(json["silenceTicks"], 15);
    assert_eq!(json["phase"], "approaching");

    let json = serde_json::to_value(FeedbackProfilePayload {
        profile: Some(FeedbackProfile::Mid),
        volume: Some(0.5),
    })
    .unwrap();
    assert_eq!(json["profile"], "mid");
    assert_eq!(json["volume"], 0.5);
}
