use super::*;
use crate::audio::BufferSink;
use parking_lot::Mutex;
use std::sync::Arc;

/// Shared state behind a MockAudioPort, inspected by tests
#[derive(Default)]
pub struct MockPortState {
    pub sink: Option<BufferSink>,
    pub running: bool,
    pub start_calls: usize,
    pub stop_calls: usize,
    pub tap_removed: bool,
    /// Number of upcoming start() calls that should fail
    pub failing_starts: usize,
    /// Reject tap installation (simulates a missing microphone)
    pub reject_tap: bool,
}

/// Mock audio input port driven directly by tests
pub struct MockAudioPort {
    pub state: Arc<Mutex<MockPortState>>,
}

impl MockAudioPort {
    pub fn new() -> (Self, Arc<Mutex<MockPortState>>) {
        let state = Arc::new(Mutex::new(MockPortState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            state,
        )
    }

    pub fn without_microphone() -> (Self, Arc<Mutex<MockPortState>>) {
        let (port, state) = Self::new();
        state.lock().reject_tap = true;
        (port, state)
    }
}

impl AudioInputPort for MockAudioPort {
    fn install_tap(&mut self, sink: BufferSink) -> Result<(), AudioCaptureError> {
        let mut state = self.state.lock();
        if state.reject_tap {
            return Err(AudioCaptureError::NoDeviceAvailable);
        }
        state.sink = Some(sink);
        Ok(())
    }

    fn remove_tap(&mut self) {
        let mut state = self.state.lock();
        state.sink = None;
        state.tap_removed = true;
    }

    fn start(&mut self) -> Result<u32, AudioCaptureError> {
        let mut state = self.state.lock();
        state.start_calls += 1;
        if state.failing_starts > 0 {
            state.failing_starts -= 1;
            return Err(AudioCaptureError::DeviceError("mock failure".to_string()));
        }
        state.running = true;
        Ok(48000)
    }

    fn stop(&mut self) {
        let mut state = self.state.lock();
        state.stop_calls += 1;
        state.running = false;
    }

    fn is_running(&self) -> bool {
        self.state.lock().running
    }
}

/// Deliver a constant-amplitude buffer through the installed tap
pub fn deliver(state: &Arc<Mutex<MockPortState>>, amplitude: f32) {
    if let Some(sink) = state.lock().sink.as_mut() {
        sink.push_buffer(&[amplitude; 1024]);
    }
}

fn monitor_with_mock() -> (AudioLevelMonitor, Arc<Mutex<MockPortState>>) {
    let (port, state) = MockAudioPort::new();
    let monitor = AudioLevelMonitor::new(Box::new(port), 64);
    (monitor, state)
}

#[test]
fn test_monitor_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<AudioLevelMonitor>();
}

#[test]
fn test_new_installs_tap() {
    let (monitor, state) = monitor_with_mock();
    assert!(monitor.has_tap());
    assert!(state.lock().sink.is_some());
}

#[test]
fn test_tick_averages_buffer_levels() {
    let (mut monitor, state) = monitor_with_mock();
    monitor.start().unwrap();

    // -20 dB and -40 dB average to -30 dB
    deliver(&state, 0.1);
    deliver(&state, 0.01);

    let sample = monitor.tick().expect("sample expected");
    assert!((sample.average_db + 30.0).abs() < 1e-3);
    assert_eq!(monitor.last_average(), Some(sample.average_db));
}

#[test]
fn test_tick_clears_accumulator() {
    let (mut monitor, state) = monitor_with_mock();
    monitor.start().unwrap();

    deliver(&state, 0.1);
    let first = monitor.tick().unwrap();
    deliver(&state, 0.01);
    let second = monitor.tick().unwrap();

    assert!((first.average_db + 20.0).abs() < 1e-3);
    assert!((second.average_db + 40.0).abs() < 1e-3);
}

#[test]
fn test_empty_interval_carries_forward() {
    let (mut monitor, state) = monitor_with_mock();
    monitor.start().unwrap();

    deliver(&state, 0.01);
    let first = monitor.tick().unwrap();
    let second = monitor.tick().expect("carried-forward sample expected");

    assert_eq!(first.average_db, second.average_db);
    assert!(!second.average_db.is_nan());
}

#[test]
fn test_no_sample_before_first_buffer() {
    let (mut monitor, _state) = monitor_with_mock();
    monitor.start().unwrap();
    assert!(monitor.tick().is_none());
    assert!(monitor.tick().is_none());
}

#[test]
fn test_tick_restarts_stopped_engine() {
    let (mut monitor, state) = monitor_with_mock();
    monitor.start().unwrap();

    state.lock().running = false;
    monitor.tick();

    let s = state.lock();
    assert!(s.running);
    assert_eq!(s.start_calls, 2);
}

#[test]
fn test_restart_failure_is_retried_next_tick() {
    let (mut monitor, state) = monitor_with_mock();
    state.lock().failing_starts = 2;

    assert!(monitor.start().is_err());
    monitor.tick();
    assert_eq!(monitor.restart_failures(), 1);
    assert!(!state.lock().running);

    monitor.tick();
    assert_eq!(monitor.restart_failures(), 0);
    assert!(state.lock().running);
}

#[test]
fn test_missing_microphone_degrades() {
    let (port, state) = MockAudioPort::without_microphone();
    let mut monitor = AudioLevelMonitor::new(Box::new(port), 64);

    assert!(!monitor.has_tap());
    assert_eq!(monitor.start(), Err(AudioCaptureError::TapNotInstalled));
    assert!(monitor.tick().is_none());
    // No restart attempts without a tap
    assert_eq!(state.lock().start_calls, 0);
}

#[test]
fn test_drop_releases_tap_and_stops_engine() {
    let (mut monitor, state) = monitor_with_mock();
    monitor.start().unwrap();
    drop(monitor);

    let s = state.lock();
    assert!(s.tap_removed);
    assert!(!s.running);
    assert!(s.sink.is_none());
    assert_eq!(s.stop_calls, 1);
}

#[test]
fn test_shutdown_is_idempotent() {
    let (mut monitor, state) = monitor_with_mock();
    monitor.shutdown();
    monitor.shutdown();
    drop(monitor);
    assert_eq!(state.lock().stop_calls, 1);
}
