// Simulated microphone: a capture thread playing a scripted level sequence
//
// The thread owns the BufferSink while running and hands it back on stop, so
// buffer delivery never takes a lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::audio::{AudioCaptureError, AudioInputPort, BufferSink};
use crate::audio_constants::{CAPTURE_BUFFER_FRAMES, DEFAULT_SAMPLE_RATE};
use crate::{debug, info, trace, warn};

/// Square wave half period in samples (~240 Hz at 48kHz)
const HALF_PERIOD: usize = 100;

/// One stretch of constant loudness
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptPhase {
    /// RMS level in dBFS
    pub level_db: f32,
    pub duration: Duration,
}

impl ScriptPhase {
    pub fn new(level_db: f32, duration: Duration) -> Self {
        Self { level_db, duration }
    }
}

/// Sequence of loudness phases, optionally looping
#[derive(Debug, Clone, PartialEq)]
pub struct LevelScript {
    pub phases: Vec<ScriptPhase>,
    pub looping: bool,
}

impl LevelScript {
    /// A single level held forever
    pub fn constant(level_db: f32) -> Self {
        Self {
            phases: vec![ScriptPhase::new(level_db, Duration::from_secs(1))],
            looping: true,
        }
    }

    /// Short loud burst, a long quiet stretch, then a pause long enough
    /// for a full approach, repeated
    pub fn demo() -> Self {
        Self {
            phases: vec![
                ScriptPhase::new(-12.0, Duration::from_secs(3)),
                ScriptPhase::new(-60.0, Duration::from_secs(25)),
                ScriptPhase::new(-18.0, Duration::from_secs(2)),
                ScriptPhase::new(-65.0, Duration::from_secs(60)),
            ],
            looping: true,
        }
    }

    /// Level (dBFS) for the buffer starting at `elapsed`
    pub fn level_at(&self, elapsed: Duration) -> Option<f32> {
        let total: Duration = self.phases.iter().map(|p| p.duration).sum();
        if total.is_zero() {
            return self.phases.last().map(|p| p.level_db);
        }

        let mut offset = if self.looping {
            Duration::from_nanos((elapsed.as_nanos() % total.as_nanos()) as u64)
        } else {
            elapsed
        };
        for phase in &self.phases {
            if offset < phase.duration {
                return Some(phase.level_db);
            }
            offset -= phase.duration;
        }
        self.phases.last().map(|p| p.level_db)
    }
}

/// Fill `buffer` with a square wave whose RMS equals `level_db`
pub fn fill_buffer(buffer: &mut [f32], level_db: f32) {
    let amplitude = 10f32.powf(level_db / 20.0).min(1.0);
    for (i, sample) in buffer.iter_mut().enumerate() {
        *sample = if (i / HALF_PERIOD) % 2 == 0 {
            amplitude
        } else {
            -amplitude
        };
    }
}

struct CaptureRun {
    running: Arc<AtomicBool>,
    handle: JoinHandle<(BufferSink, Duration)>,
}

/// Audio input port backed by a scripted capture thread
pub struct SimulatedMicrophone {
    script: Arc<LevelScript>,
    sample_rate: u32,
    /// Pace buffers in real time; otherwise deliver as fast as possible
    realtime: bool,
    sink: Option<BufferSink>,
    /// Script position carried across restarts
    elapsed: Duration,
    run: Option<CaptureRun>,
}

impl SimulatedMicrophone {
    pub fn new(script: LevelScript) -> Self {
        Self {
            script: Arc::new(script),
            sample_rate: DEFAULT_SAMPLE_RATE,
            realtime: true,
            sink: None,
            elapsed: Duration::ZERO,
            run: None,
        }
    }

    /// Deliver buffers without sleeping between them
    pub fn unpaced(mut self) -> Self {
        self.realtime = false;
        self
    }

    pub fn buffer_duration(&self) -> Duration {
        Duration::from_secs_f64(CAPTURE_BUFFER_FRAMES as f64 / self.sample_rate as f64)
    }

    fn join(&mut self) {
        if let Some(run) = self.run.take() {
            run.running.store(false, Ordering::SeqCst);
            match run.handle.join() {
                Ok((sink, elapsed)) => {
                    self.sink = Some(sink);
                    self.elapsed = elapsed;
                }
                Err(_) => warn!("[sim-mic] Capture thread panicked, tap lost"),
            }
        }
    }
}

impl AudioInputPort for SimulatedMicrophone {
    fn install_tap(&mut self, sink: BufferSink) -> Result<(), AudioCaptureError> {
        if self.run.is_some() {
            return Err(AudioCaptureError::DeviceError(
                "cannot install a tap while capturing".to_string(),
            ));
        }
        self.sink = Some(sink);
        debug!("[sim-mic] Tap installed");
        Ok(())
    }

    fn remove_tap(&mut self) {
        self.join();
        self.sink = None;
        debug!("[sim-mic] Tap removed");
    }

    fn start(&mut self) -> Result<u32, AudioCaptureError> {
        if self.is_running() {
            return Ok(self.sample_rate);
        }
        // Reap a thread that exited on its own
        self.join();

        let mut sink = self.sink.take().ok_or(AudioCaptureError::TapNotInstalled)?;
        let running = Arc::new(AtomicBool::new(true));
        let script = Arc::clone(&self.script);
        let buffer_duration = self.buffer_duration();
        let realtime = self.realtime;
        let mut elapsed = self.elapsed;
        let flag = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("sim-mic".to_string())
            .spawn(move || {
                let mut buffer = vec![0.0f32; CAPTURE_BUFFER_FRAMES];
                while flag.load(Ordering::SeqCst) {
                    let Some(level) = script.level_at(elapsed) else {
                        break;
                    };
                    fill_buffer(&mut buffer, level);
                    if !sink.push_buffer(&buffer) {
                        trace!("[sim-mic] Accumulator full");
                    }
                    elapsed += buffer_duration;
                    if realtime {
                        thread::sleep(buffer_duration);
                    } else {
                        thread::yield_now();
                    }
                }
                (sink, elapsed)
            })
            .map_err(|e| AudioCaptureError::StreamError(e.to_string()))?;

        self.run = Some(CaptureRun { running, handle });
        info!("[sim-mic] Capture started at {} Hz", self.sample_rate);
        Ok(self.sample_rate)
    }

    fn stop(&mut self) {
        if self.run.is_some() {
            self.join();
            debug!("[sim-mic] Capture stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.run
            .as_ref()
            .map(|r| r.running.load(Ordering::SeqCst) && !r.handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for SimulatedMicrophone {
    fn drop(&mut self) {
        self.join();
    }
}

#[cfg(test)]
#[path = "microphone_test.rs"]
mod tests;
