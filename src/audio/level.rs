//! Per-buffer loudness measurement (RMS and dBFS).

use crate::audio_constants::SILENCE_FLOOR_DB;

/// Audio level metrics for one capture buffer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelMetrics {
    /// Peak level (maximum absolute sample value)
    pub peak: f32,
    /// RMS level (root mean square)
    pub rms: f32,
    /// Number of samples analyzed
    pub sample_count: usize,
}

impl LevelMetrics {
    /// Calculate peak and RMS from samples
    ///
    /// Returns all-zero metrics for an empty buffer.
    pub fn from_samples(samples: &[f32]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let mut peak: f32 = 0.0;
        let mut sum_sq: f32 = 0.0;

        for &sample in samples {
            let abs_sample = sample.abs();
            if abs_sample > peak {
                peak = abs_sample;
            }
            sum_sq += sample * sample;
        }

        let rms = (sum_sq / samples.len() as f32).sqrt();

        Self {
            peak,
            rms,
            sample_count: samples.len(),
        }
    }

    /// Convert RMS to dBFS, clamped to the silence floor
    pub fn rms_dbfs(&self) -> f32 {
        amplitude_to_dbfs(self.rms)
    }
}

/// Convert a linear amplitude to dBFS: `20 * log10(amplitude)`
///
/// Zero (or negative) amplitude maps to `SILENCE_FLOOR_DB` instead of
/// negative infinity.
pub fn amplitude_to_dbfs(amplitude: f32) -> f32 {
    if amplitude <= 0.0 {
        SILENCE_FLOOR_DB
    } else {
        (20.0 * amplitude.log10()).max(SILENCE_FLOOR_DB)
    }
}

/// Loudness of a single capture buffer in dBFS
///
/// Returns `None` for an empty buffer or one containing non-finite samples,
/// so nothing undefined reaches the accumulator.
pub fn buffer_level_db(samples: &[f32]) -> Option<f32> {
    if samples.is_empty() {
        return None;
    }
    let metrics = LevelMetrics::from_samples(samples);
    if !metrics.rms.is_finite() {
        return None;
    }
    Some(metrics.rms_dbfs())
}
