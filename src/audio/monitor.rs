// Audio level monitor: turns per-buffer dBFS values into one averaged
// LevelSample per aggregation interval.
//
// The capture thread only appends to the SPSC accumulator. Everything in this
// type runs on the session's scheduling context, once per tick.

use super::{level_channel, AudioCaptureError, AudioInputPort, LevelAccumulator, LevelSample};
use crate::{debug, info, trace, warn};

/// Averages per-buffer loudness over fixed intervals and keeps the capture
/// engine running.
///
/// Owns the audio input port for its whole lifetime: the tap is installed on
/// construction and removed (with the engine stopped) on drop.
pub struct AudioLevelMonitor {
    port: Box<dyn AudioInputPort>,
    accumulator: LevelAccumulator,
    /// Last emitted average, carried forward over empty intervals
    last_average: Option<f32>,
    tap_installed: bool,
    /// Consecutive failed (re)start attempts
    restart_failures: u32,
}

impl AudioLevelMonitor {
    /// Create a monitor and install its capture tap on the given port
    ///
    /// A tap installation failure is logged, not returned: the monitor then
    /// never sees a buffer and never emits a sample.
    pub fn new(mut port: Box<dyn AudioInputPort>, capacity: usize) -> Self {
        let (sink, accumulator) = level_channel(capacity);
        let tap_installed = match port.install_tap(sink) {
            Ok(()) => true,
            Err(e) => {
                warn!("[monitor] Failed to install capture tap: {}", e);
                false
            }
        };

        Self {
            port,
            accumulator,
            last_average: None,
            tap_installed,
            restart_failures: 0,
        }
    }

    /// Start the capture engine for the first time
    ///
    /// Returns the device sample rate. Callers treat an error as "no
    /// microphone" and keep running; `tick()` keeps retrying.
    pub fn start(&mut self) -> Result<u32, AudioCaptureError> {
        if !self.tap_installed {
            return Err(AudioCaptureError::TapNotInstalled);
        }
        let rate = self.port.start()?;
        info!("[monitor] Capture engine started at {} Hz", rate);
        self.restart_failures = 0;
        Ok(rate)
    }

    /// Close the current interval
    ///
    /// Averages every buffer level received since the previous tick and
    /// clears the accumulator. An empty interval repeats the previous
    /// average; with no previous average there is nothing to emit.
    /// Afterwards the engine is restarted if it is not running.
    pub fn tick(&mut self) -> Option<LevelSample> {
        let dropped = self.accumulator.take_dropped();
        if dropped > 0 {
            warn!("[monitor] Accumulator full, dropped {} buffer levels", dropped);
        }

        let (sum, count) = self.accumulator.drain_sum();
        let average = if count > 0 {
            let mean = (sum / count as f64) as f32;
            trace!("[monitor] Averaged {} buffers: {:.2} dB", count, mean);
            self.last_average = Some(mean);
            Some(mean)
        } else {
            debug!(
                "[monitor] No buffers this interval, carrying forward {:?}",
                self.last_average
            );
            self.last_average
        };

        self.ensure_running();

        average.map(LevelSample::now)
    }

    /// Restart the capture engine if it stopped; failures retry next tick
    fn ensure_running(&mut self) {
        if !self.tap_installed || self.port.is_running() {
            return;
        }
        match self.port.start() {
            Ok(rate) => {
                if self.restart_failures > 0 {
                    info!(
                        "[monitor] Capture engine restarted at {} Hz after {} failed attempts",
                        rate, self.restart_failures
                    );
                } else {
                    debug!("[monitor] Capture engine restarted at {} Hz", rate);
                }
                self.restart_failures = 0;
            }
            Err(e) => {
                self.restart_failures += 1;
                warn!(
                    "[monitor] Capture engine restart failed (attempt {}), retrying next tick: {}",
                    self.restart_failures, e
                );
            }
        }
    }

    /// Last emitted (or carried-forward) average
    pub fn last_average(&self) -> Option<f32> {
        self.last_average
    }

    /// Whether the capture tap is installed
    pub fn has_tap(&self) -> bool {
        self.tap_installed
    }

    /// Consecutive failed restart attempts
    pub fn restart_failures(&self) -> u32 {
        self.restart_failures
    }

    /// Stop the engine and release the capture tap. Idempotent.
    pub fn shutdown(&mut self) {
        if !self.tap_installed {
            return;
        }
        self.port.stop();
        self.port.remove_tap();
        self.tap_installed = false;
        debug!("[monitor] Capture tap released");
    }
}

impl Drop for AudioLevelMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[path = "monitor_test.rs"]
pub(crate) mod tests;
