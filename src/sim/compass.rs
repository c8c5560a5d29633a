// Simulated compass: a sensor thread sweeping the bearing at a fixed rate

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::heading::{HeadingError, HeadingPort, HeadingSender};
use crate::{debug, warn};

/// Heading port that rotates steadily from a starting bearing
pub struct SimulatedCompass {
    available: bool,
    start_bearing: f64,
    degrees_per_second: f64,
    interval: Duration,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl SimulatedCompass {
    pub fn new(start_bearing: f64, degrees_per_second: f64) -> Self {
        Self {
            available: true,
            start_bearing,
            degrees_per_second,
            interval: Duration::from_millis(50),
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }

    /// A device without a compass
    pub fn unavailable() -> Self {
        let mut compass = Self::new(0.0, 0.0);
        compass.available = false;
        compass
    }

    /// Sensor update interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Bearing after `elapsed`, normalized into [0, 360)
pub fn bearing_after(start: f64, degrees_per_second: f64, elapsed: Duration) -> f64 {
    (start + degrees_per_second * elapsed.as_secs_f64()).rem_euclid(360.0)
}

impl HeadingPort for SimulatedCompass {
    fn is_available(&self) -> bool {
        self.available
    }

    fn subscribe(&mut self, sender: HeadingSender) -> Result<(), HeadingError> {
        if !self.available {
            return Err(HeadingError::Unavailable);
        }
        if self.is_running() {
            self.unsubscribe();
        }

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let (start, rate, interval) = (self.start_bearing, self.degrees_per_second, self.interval);

        let handle = thread::Builder::new()
            .name("sim-compass".to_string())
            .spawn(move || {
                debug!("[sim-compass] Sensor started at {:.1}°", start);
                let mut elapsed = Duration::ZERO;
                while running.load(Ordering::SeqCst) && !sender.is_closed() {
                    sender.send(bearing_after(start, rate, elapsed));
                    thread::sleep(interval);
                    elapsed += interval;
                }
                debug!("[sim-compass] Sensor stopped");
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                HeadingError::Disconnected(e.to_string())
            })?;

        self.thread_handle = Some(handle);
        Ok(())
    }

    fn unsubscribe(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                warn!("[sim-compass] Sensor thread panicked");
            }
        }
    }
}

impl Drop for SimulatedCompass {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
