use tap_trainer::config::{Config, GesturePolicy};
use tempfile::TempDir;

#[test]
fn test_config_lifecycle() {
    // Create a temporary directory for test config
    let temp_dir = TempDir::new().unwrap();

    // Override the config path for testing
    unsafe {
        std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());
    }

    // Test that config doesn't exist initially
    assert!(!Config::exists().unwrap());

    // Missing file loads as defaults
    let defaults = Config::load().unwrap();
    assert_eq!(defaults.gesture_policy, GesturePolicy::Count);
    assert_eq!(defaults.click_window_ms, 600);
    assert_eq!(defaults.double_tap_delay_ms, 220);

    let config = Config::new();
    config.save().unwrap();
    assert!(Config::exists().unwrap());

    // Test config mutation
    let mut config = Config::load().unwrap();
    config.set_value("gesture_policy", "deferred").unwrap();
    config.set_value("normalization", "true").unwrap();
    config.set_value("gain", "1.5").unwrap();
    config.set_value("catalog", "~/clips/catalog.toml").unwrap();
    config.save().unwrap();

    // Verify mutations persisted
    let reloaded = Config::load().unwrap();
    assert_eq!(reloaded.gesture_policy, GesturePolicy::Deferred);
    assert!(reloaded.normalization);
    assert_eq!(reloaded.gain, 1.5);
    assert_eq!(reloaded.catalog.as_deref(), Some("~/clips/catalog.toml"));

    // Invalid keys and values are refused
    let mut config = Config::load().unwrap();
    assert!(config.set_value("invalid_key", "value").is_err());
    assert!(config.set_value("gesture_policy", "triple").is_err());
    assert!(config.set_value("volume", "1.5").is_err());
    assert!(config.set_value("click_window_ms", "0").is_err());
}
