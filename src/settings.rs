// Proximity settings - loads and persists tuning overrides as JSON
//
// Every field defaults from audio_constants, so a partial (or missing) file
// yields a working configuration.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::audio_constants::{
    ACTIVE_THRESHOLD_DB, APPROACH_STEP, COOLDOWN_THRESHOLD_DB, DEFAULT_COOLDOWN_TICKS,
    DEFAULT_THRESHOLD_DB, FAR_BAND_EDGE, HEADING_CHANNEL_CAPACITY, IDLE_THRESHOLD_DB,
    LEVEL_ACCUMULATOR_CAPACITY, LEVEL_TICK_INTERVAL_MS, MAX_DISTANCE, NEAR_BAND_EDGE,
    SILENCE_TICKS_TO_SHOW,
};
use crate::feedback::FeedbackBands;
use crate::proximity::ControllerConfig;
use crate::{debug, info};

/// Environment variable overriding the settings file location
pub const SETTINGS_PATH_ENV: &str = "SPECTRESCOPE_SETTINGS";

const APP_DIR_NAME: &str = "spectrescope";
const SETTINGS_FILE_NAME: &str = "settings.json";

/// Error types for settings operations
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Tunable parameters of a proximity session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProximitySettings {
    /// Canonical loudness threshold (dBFS)
    pub threshold_db: f32,
    /// Threshold applied while the entity is hidden, if set
    pub idle_threshold_db: Option<f32>,
    /// Threshold applied while the entity approaches, if set
    pub active_threshold_db: Option<f32>,
    /// Unreachable threshold held during the encounter cooldown
    pub cooldown_threshold_db: f32,
    pub cooldown_ticks: u32,
    pub tick_interval_ms: u64,
    pub silence_ticks_to_show: u32,
    pub approach_step_per_tick: f64,
    pub max_distance: f64,
    pub near_band_edge: f64,
    pub far_band_edge: f64,
    pub accumulator_capacity: usize,
    pub heading_channel_capacity: usize,
    /// Angle of the first appearance in radians (None = random)
    pub initial_angle: Option<f64>,
}

impl Default for ProximitySettings {
    fn default() -> Self {
        Self {
            threshold_db: DEFAULT_THRESHOLD_DB,
            idle_threshold_db: None,
            active_threshold_db: None,
            cooldown_threshold_db: COOLDOWN_THRESHOLD_DB,
            cooldown_ticks: DEFAULT_COOLDOWN_TICKS,
            tick_interval_ms: LEVEL_TICK_INTERVAL_MS,
            silence_ticks_to_show: SILENCE_TICKS_TO_SHOW,
            approach_step_per_tick: APPROACH_STEP as f64,
            max_distance: MAX_DISTANCE as f64,
            near_band_edge: NEAR_BAND_EDGE as f64,
            far_band_edge: FAR_BAND_EDGE as f64,
            accumulator_capacity: LEVEL_ACCUMULATOR_CAPACITY,
            heading_channel_capacity: HEADING_CHANNEL_CAPACITY,
            initial_angle: None,
        }
    }
}

impl ProximitySettings {
    /// Settings with the idle/active threshold presets filled in
    pub fn with_threshold_presets() -> Self {
        Self {
            idle_threshold_db: Some(IDLE_THRESHOLD_DB),
            active_threshold_db: Some(ACTIVE_THRESHOLD_DB),
            ..Self::default()
        }
    }

    /// Default settings file: `<config_dir>/spectrescope/settings.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(SETTINGS_FILE_NAME))
    }

    /// Resolve the settings path: explicit path, then the environment
    /// variable, then the per-user config directory
    pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        match std::env::var_os(SETTINGS_PATH_ENV) {
            Some(value) if !value.is_empty() => Some(PathBuf::from(value)),
            _ => Self::default_path(),
        }
    }

    /// Load settings from a JSON file
    ///
    /// A missing file yields defaults. The loaded values are validated.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        debug!("[settings] Loading settings from {:?}", path);

        if !path.exists() {
            debug!("[settings] No settings file found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self = serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;

        info!("[settings] Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Resolve the path and load from it; defaults when no path resolves
    pub fn load_resolved(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        match Self::resolve_path(explicit) {
            Some(path) => Self::load(&path),
            None => {
                debug!("[settings] No config directory, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Persist settings using atomic write (temp file + rename)
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        self.validate()?;
        let io_err = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let content = serde_json::to_string_pretty(self).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let temp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&temp_path).map_err(io_err)?;
            file.write_all(content.as_bytes()).map_err(io_err)?;
            file.sync_all().map_err(io_err)?;
        }

        fs::rename(&temp_path, path).map_err(|source| {
            let _ = fs::remove_file(&temp_path);
            io_err(source)
        })?;

        debug!("[settings] Settings persisted to {:?}", path);
        Ok(())
    }

    /// Reject values the session cannot run with
    pub fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |msg: String| Err(SettingsError::Invalid(msg));

        if self.tick_interval_ms == 0 {
            return invalid("tickIntervalMs must be positive".to_string());
        }
        if !(self.max_distance > 0.0 && self.max_distance <= MAX_DISTANCE as f64) {
            return invalid(format!(
                "maxDistance must be in (0, {}], got {}",
                MAX_DISTANCE, self.max_distance
            ));
        }
        if self.silence_ticks_to_show == 0 {
            return invalid("silenceTicksToShow must be at least 1".to_string());
        }
        if !(self.approach_step_per_tick.is_finite() && self.approach_step_per_tick > 0.0) {
            return invalid(format!(
                "approachStepPerTick must be positive, got {}",
                self.approach_step_per_tick
            ));
        }
        if !(self.near_band_edge >= 0.0 && self.near_band_edge <= self.far_band_edge) {
            return invalid(format!(
                "band edges out of order: near {} far {}",
                self.near_band_edge, self.far_band_edge
            ));
        }
        if !self.far_band_edge.is_finite() {
            return invalid("farBandEdge must be finite".to_string());
        }
        let thresholds = [Some(self.threshold_db), self.idle_threshold_db, self.active_threshold_db];
        if thresholds.iter().flatten().any(|t| !t.is_finite()) {
            return invalid("thresholds must be finite".to_string());
        }
        if self.accumulator_capacity == 0 || self.heading_channel_capacity == 0 {
            return invalid("channel capacities must be positive".to_string());
        }
        if let Some(angle) = self.initial_angle {
            if !angle.is_finite() {
                return invalid("initialAngle must be finite".to_string());
            }
        }
        Ok(())
    }

    /// Controller configuration derived from these settings
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            threshold_db: self.idle_threshold_db.unwrap_or(self.threshold_db),
            cooldown_threshold_db: self.cooldown_threshold_db,
            cooldown_ticks: self.cooldown_ticks,
            silence_ticks_to_show: self.silence_ticks_to_show,
            approach_step: self.approach_step_per_tick,
            max_distance: self.max_distance,
            initial_angle: self.initial_angle,
        }
    }

    /// Feedback band edges derived from these settings
    pub fn bands(&self) -> FeedbackBands {
        FeedbackBands {
            near_edge: self.near_band_edge,
            far_edge: self.far_band_edge,
        }
    }

    /// Threshold for a phase: the preset if configured, else the canonical one
    pub fn threshold_for(&self, approaching: bool) -> f32 {
        let preset = if approaching {
            self.active_threshold_db
        } else {
            self.idle_threshold_db
        };
        preset.unwrap_or(self.threshold_db)
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_interval_ms)
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
