// Audio input module: capture port, capture-side sink and level monitoring

use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    HeapRb,
};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub mod level;
pub use level::{amplitude_to_dbfs, buffer_level_db, LevelMetrics};

pub mod monitor;
pub use monitor::AudioLevelMonitor;

/// One averaged loudness reading, produced once per aggregation interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelSample {
    /// Mean of the per-buffer dBFS values seen during the interval
    pub average_db: f32,
    /// When the sample was produced
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl LevelSample {
    /// Create a sample stamped with the current time
    pub fn now(average_db: f32) -> Self {
        Self {
            average_db,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Errors that can occur while driving the audio input port
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AudioCaptureError {
    /// No audio input device is available
    #[error("No audio input device available")]
    NoDeviceAvailable,
    /// Error with the audio device
    #[error("Audio device error: {0}")]
    DeviceError(String),
    /// Error with the audio stream
    #[error("Audio stream error: {0}")]
    StreamError(String),
    /// Engine started before a tap was installed
    #[error("No capture tap installed")]
    TapNotInstalled,
}

/// Capture-side half of the level accumulator
///
/// Owned by the capture thread. Each delivered buffer is reduced to a single
/// dBFS value and appended with one non-blocking `try_push`; nothing here
/// locks or allocates.
pub struct BufferSink {
    producer: ringbuf::HeapProd<f32>,
    dropped: Arc<AtomicUsize>,
}

impl BufferSink {
    /// Reduce a buffer of mono samples to dBFS and append it
    ///
    /// Returns false if the buffer was empty/invalid or the accumulator was
    /// full (the value is dropped and counted).
    pub fn push_buffer(&mut self, samples: &[f32]) -> bool {
        let Some(db) = buffer_level_db(samples) else {
            return false;
        };
        self.push_level(db)
    }

    /// Append an already-computed per-buffer level
    pub fn push_level(&mut self, db: f32) -> bool {
        if self.producer.try_push(db).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        true
    }
}

impl std::fmt::Debug for BufferSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferSink")
            .field("occupied", &self.producer.occupied_len())
            .field("dropped", &self.dropped.load(Ordering::Relaxed))
            .finish()
    }
}

/// Monitor-side half of the level accumulator
pub struct LevelAccumulator {
    consumer: ringbuf::HeapCons<f32>,
    dropped: Arc<AtomicUsize>,
}

impl LevelAccumulator {
    /// Drain every pending per-buffer value and return (sum, count)
    pub fn drain_sum(&mut self) -> (f64, usize) {
        let mut sum = 0.0f64;
        let mut count = 0usize;
        while let Some(db) = self.consumer.try_pop() {
            sum += db as f64;
            count += 1;
        }
        (sum, count)
    }

    /// Number of values waiting to be drained
    pub fn pending(&self) -> usize {
        self.consumer.occupied_len()
    }

    /// Take and reset the count of values dropped because the buffer was full
    pub fn take_dropped(&self) -> usize {
        self.dropped.swap(0, Ordering::Relaxed)
    }
}

/// Create a connected sink/accumulator pair backed by an SPSC ring buffer
pub fn level_channel(capacity: usize) -> (BufferSink, LevelAccumulator) {
    let rb = HeapRb::<f32>::new(capacity.max(1));
    let (producer, consumer) = rb.split();
    let dropped = Arc::new(AtomicUsize::new(0));
    (
        BufferSink {
            producer,
            dropped: Arc::clone(&dropped),
        },
        LevelAccumulator { consumer, dropped },
    )
}

/// Audio Input Port: the platform capture engine behind a trait
///
/// Mirrors a tap-based capture engine: the tap (sink) is installed once,
/// the engine can then be started and stopped repeatedly. Buffers are
/// delivered on the implementation's own capture thread.
pub trait AudioInputPort: Send {
    /// Install the capture tap that receives every buffer
    fn install_tap(&mut self, sink: BufferSink) -> Result<(), AudioCaptureError>;

    /// Remove the capture tap, releasing the sink
    fn remove_tap(&mut self);

    /// Start (or restart) capturing; returns the device sample rate
    fn start(&mut self) -> Result<u32, AudioCaptureError>;

    /// Stop capturing
    fn stop(&mut self);

    /// Whether the engine is currently delivering buffers
    fn is_running(&self) -> bool;
}
