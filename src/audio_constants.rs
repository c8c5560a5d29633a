//! Centralized constants for level monitoring and proximity simulation.
//!
//! All tuning numbers are defined here with documentation explaining their
//! purpose and constraints. `ProximitySettings` takes its defaults from this
//! module, so a value changed here changes the out-of-the-box behavior.

// =============================================================================
// LEVEL MONITORING
// =============================================================================

/// Number of frames per capture buffer delivered by the audio input port.
///
/// At 48kHz this is ~21ms of audio, so the monitor sees roughly 47 buffers
/// per aggregation interval.
pub const CAPTURE_BUFFER_FRAMES: usize = 1024;

/// Nominal capture sample rate (Hz) used by the simulated microphone.
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Aggregation interval for averaged loudness samples (milliseconds).
///
/// One `LevelSample` is emitted per interval, and one interval below the
/// threshold counts as one silence tick.
pub const LEVEL_TICK_INTERVAL_MS: u64 = 1000;

/// Capacity of the capture-to-monitor accumulator (per-buffer dB values).
///
/// Sized for ~4 seconds of 1024-frame buffers at 48kHz so a stalled tick
/// does not immediately drop values.
pub const LEVEL_ACCUMULATOR_CAPACITY: usize = 256;

/// Floor reported for a buffer whose RMS is zero (dBFS).
///
/// `20 * log10(0)` is negative infinity; a digital-silence buffer is clamped
/// here so the interval mean stays finite.
pub const SILENCE_FLOOR_DB: f32 = -160.0;

// =============================================================================
// THRESHOLDS
// =============================================================================

/// Canonical loudness threshold (dBFS).
///
/// An averaged sample strictly below this value counts as silence.
pub const DEFAULT_THRESHOLD_DB: f32 = -30.0;

/// Threshold preset observed while the entity is hidden (dBFS).
pub const IDLE_THRESHOLD_DB: f32 = -40.0;

/// Threshold preset observed while the entity is approaching (dBFS).
pub const ACTIVE_THRESHOLD_DB: f32 = -35.0;

/// Unreachable threshold applied during the post-encounter cooldown (dBFS).
///
/// No real sample averages below this, so silence cannot accrue while it is
/// in force.
pub const COOLDOWN_THRESHOLD_DB: f32 = -1000.0;

/// Ticks the cooldown threshold stays in force after an encounter.
///
/// Zero restores the operating threshold within the encounter tick itself.
pub const DEFAULT_COOLDOWN_TICKS: u32 = 0;

// =============================================================================
// APPROACH
// =============================================================================

/// Consecutive silence ticks required before the entity becomes visible.
pub const SILENCE_TICKS_TO_SHOW: u32 = 15;

/// Distance closed per silent tick while approaching.
pub const APPROACH_STEP: f32 = 5.0;

/// Starting (and maximum) radar distance of the entity.
pub const MAX_DISTANCE: f32 = 190.0;

// =============================================================================
// FEEDBACK BANDS
// =============================================================================

/// Distances strictly below this edge select the Near profile.
pub const NEAR_BAND_EDGE: f32 = 45.0;

/// Distances at or above this edge select the Far profile.
///
/// Also the denominator of the Mid band volume ramp.
pub const FAR_BAND_EDGE: f32 = 95.0;

// =============================================================================
// CHANNELS
// =============================================================================

/// Buffer size for the heading event channel.
///
/// Compass callbacks arrive at a few tens of Hz; 64 events absorb a stalled
/// tick without dropping.
pub const HEADING_CHANNEL_CAPACITY: usize = 64;

/// Buffer size for each outbound event broadcast channel.
pub const EVENT_CHANNEL_BUFFER_SIZE: usize = 64;

/// Returns the number of capture buffers expected per aggregation interval.
///
/// Guards against a zero frame count so callers can size buffers safely.
pub fn buffers_per_tick(sample_rate: u32, frames: usize, tick_ms: u64) -> usize {
    if frames == 0 {
        return 0;
    }
    (sample_rate as u64 * tick_ms / 1000 / frames as u64) as usize
}

#[cfg(test)]
#[path = "audio_constants_test.rs"]
mod tests;
