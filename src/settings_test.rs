// Tests for ProximitySettings
// Test cases:
// - Missing file yields defaults
// - Partial file keeps defaults for absent fields (camelCase keys)
// - Invalid JSON / invalid values are reported
// - Save then load preserves values
// - Path resolution order: explicit, env var, config dir

use super::*;
use serial_test::serial;
use tempfile::TempDir;

#[test]
fn test_defaults_match_constants() {
    let settings = ProximitySettings::default();
    assert_eq!(settings.threshold_db, -30.0);
    assert_eq!(settings.cooldown_threshold_db, -1000.0);
    assert_eq!(settings.silence_ticks_to_show, 15);
    assert_eq!(settings.max_distance, 190.0);
    assert_eq!(settings.tick_interval_ms, 1000);
    assert!(settings.idle_threshold_db.is_none());
    assert!(settings.validate().is_ok());
}

#[test]
fn test_missing_file_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("absent.json");
    let settings = ProximitySettings::load(&path).unwrap();
    assert_eq!(settings, ProximitySettings::default());
}

#[test]
fn test_partial_file_keeps_other_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("settings.json");
    fs::write(&path, r#"{ "thresholdDb": -42.5, "silenceTicksToShow": 3 }"#).unwrap();

    let settings = ProximitySettings::load(&path).unwrap();
    assert_eq!(settings.threshold_db, -42.5);
    assert_eq!(settings.silence_ticks_to_show, 3);
    assert_eq!(settings.far_band_edge, 95.0);
}

#[test]
fn test_malformed_json_is_parse_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("settings.json");
    fs::write(&path, "{ not json").unwrap();

    let result = ProximitySettings::load(&path);
    assert!(matches!(result, Err(SettingsError::Parse { .. })));
}

#[test]
fn test_invalid_values_are_rejected_on_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("settings.json");
    fs::write(&path, r#"{ "nearBandEdge": 120, "farBandEdge": 95 }"#).unwrap();

    let result = ProximitySettings::load(&path);
    assert!(matches!(result, Err(SettingsError::Invalid(_))));
}

#[test]
fn test_validate_rejects_zero_interval_and_distance() {
    let settings = ProximitySettings {
        tick_interval_ms: 0,
        ..ProximitySettings::default()
    };
    assert!(settings.validate().is_err());

    let settings = ProximitySettings {
        max_distance: 0.0,
        ..ProximitySettings::default()
    };
    assert!(settings.validate().is_err());

    let settings = ProximitySettings {
        threshold_db: f32::NAN,
        ..ProximitySettings::default()
    };
    assert!(settings.validate().is_err());
}

#[test]
fn test_validate_rejects_zero_silence_ticks_to_show() {
    let settings = ProximitySettings {
        silence_ticks_to_show: 0,
        ..ProximitySettings::default()
    };
    assert!(matches!(settings.validate(), Err(SettingsError::Invalid(_))));

    // With a zero show count a loud sample would reveal the entity
    let settings = ProximitySettings {
        silence_ticks_to_show: 1,
        ..ProximitySettings::default()
    };
    assert!(settings.validate().is_ok());
    let mut controller =
        crate::proximity::ProximityController::with_config(settings.controller_config());
    let out = controller.on_level_sample(&crate::audio::LevelSample::now(0.0));
    assert!(!out.visible);
}

#[test]
fn test_validate_caps_max_distance() {
    let settings = ProximitySettings {
        max_distance: MAX_DISTANCE as f64 + 1.0,
        ..ProximitySettings::default()
    };
    assert!(matches!(settings.validate(), Err(SettingsError::Invalid(_))));

    let settings = ProximitySettings {
        max_distance: MAX_DISTANCE as f64,
        ..ProximitySettings::default()
    };
    assert!(settings.validate().is_ok());

    let settings = ProximitySettings {
        max_distance: f64::NAN,
        ..ProximitySettings::default()
    };
    assert!(settings.validate().is_err());
}

#[test]
fn test_save_then_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("settings.json");
    let settings = ProximitySettings {
        cooldown_ticks: 3,
        initial_angle: Some(1.25),
        ..ProximitySettings::with_threshold_presets()
    };

    settings.save(&path).unwrap();
    assert!(!path.with_extension("tmp").exists());
    assert_eq!(ProximitySettings::load(&path).unwrap(), settings);
}

#[test]
fn test_controller_config_and_bands() {
    let settings = ProximitySettings {
        approach_step_per_tick: 10.0,
        near_band_edge: 30.0,
        ..ProximitySettings::default()
    };
    let config = settings.controller_config();
    assert_eq!(config.approach_step, 10.0);
    assert_eq!(config.threshold_db, -30.0);
    assert_eq!(settings.bands().near_edge, 30.0);
}

#[test]
fn test_threshold_presets() {
    let settings = ProximitySettings::with_threshold_presets();
    assert_eq!(settings.threshold_for(false), -40.0);
    assert_eq!(settings.threshold_for(true), -35.0);
    assert_eq!(settings.controller_config().threshold_db, -40.0);

    let plain = ProximitySettings::default();
    assert_eq!(plain.threshold_for(true), -30.0);
}

#[test]
#[serial]
fn test_resolve_path_prefers_explicit() {
    std::env::set_var(SETTINGS_PATH_ENV, "/tmp/from-env.json");
    let path = ProximitySettings::resolve_path(Some(Path::new("/tmp/explicit.json")));
    std::env::remove_var(SETTINGS_PATH_ENV);
    assert_eq!(path, Some(PathBuf::from("/tmp/explicit.json")));
}

#[test]
#[serial]
fn test_resolve_path_uses_env_var() {
    std::env::set_var(SETTINGS_PATH_ENV, "/tmp/from-env.json");
    let path = ProximitySettings::resolve_path(None);
    std::env::remove_var(SETTINGS_PATH_ENV);
    assert_eq!(path, Some(PathBuf::from("/tmp/from-env.json")));
}

#[test]
#[serial]
fn test_resolve_path_falls_back_to_config_dir() {
    std::env::remove_var(SETTINGS_PATH_ENV);
    let path = ProximitySettings::resolve_path(None);
    assert_eq!(path, ProximitySettings::default_path());
}

#[test]
#[serial]
fn test_load_resolved_reads_env_path() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("settings.json");
    fs::write(&path, r#"{ "cooldownTicks": 2 }"#).unwrap();

    std::env::set_var(SETTINGS_PATH_ENV, &path);
    let settings = ProximitySettings::load_resolved(None);
    std::env::remove_var(SETTINGS_PATH_ENV);
    assert_eq!(settings.unwrap().cooldown_ticks, 2);
}
