//! Application configuration management.
//!
//! This module handles the deployment settings for the trainer: which catalog
//! to load, which gesture policy interprets taps, the gesture timings, the
//! initial routing and volume, and where logs go. Configuration is stored in
//! the user's config directory (typically ~/.config/tap-trainer/config.toml).
//! Nothing about a listening session (position, last track) is written back.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{CLICK_WINDOW, DEFAULT_LOG_FILE, DOUBLE_TAP_DELAY, GAIN_MAX, VOLUME_MAX};

const APP_DIR: &str = "tap-trainer";

/// Which gesture interpretation a deployment uses. The two are never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GesturePolicy {
    /// Act on every tap, correcting with the accumulated tap count
    Count,
    /// Wait briefly to tell a single tap from a double tap
    Deferred,
}

impl FromStr for GesturePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "count" => Ok(Self::Count),
            "deferred" => Ok(Self::Deferred),
            _ => Err(format!("Unknown gesture policy: {s} (use 'count' or 'deferred')")),
        }
    }
}

impl std::fmt::Display for GesturePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Count => write!(f, "count"),
            Self::Deferred => write!(f, "deferred"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: Option<String>,
    #[serde(default = "default_gesture_policy")]
    pub gesture_policy: GesturePolicy,
    #[serde(default = "default_click_window_ms")]
    pub click_window_ms: u64,
    #[serde(default = "default_double_tap_delay_ms")]
    pub double_tap_delay_ms: u64,
    #[serde(default)]
    pub normalization: bool,
    #[serde(default = "default_unity")]
    pub gain: f32,
    #[serde(default = "default_unity")]
    pub volume: f32,
    #[serde(default = "default_routing")]
    pub routing: bool,
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

fn default_gesture_policy() -> GesturePolicy {
    GesturePolicy::Count
}

fn default_click_window_ms() -> u64 {
    CLICK_WINDOW.as_millis() as u64
}

fn default_double_tap_delay_ms() -> u64 {
    DOUBLE_TAP_DELAY.as_millis() as u64
}

fn default_unity() -> f32 {
    1.0
}

fn default_routing() -> bool {
    true
}

fn default_log_file() -> String {
    DEFAULT_LOG_FILE.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            catalog: None,
            gesture_policy: default_gesture_policy(),
            click_window_ms: default_click_window_ms(),
            double_tap_delay_ms: default_double_tap_delay_ms(),
            normalization: false,
            gain: default_unity(),
            volume: default_unity(),
            routing: default_routing(),
            log_file: default_log_file(),
        }
    }

    pub fn click_window(&self) -> Duration {
        Duration::from_millis(self.click_window_ms)
    }

    pub fn double_tap_delay(&self) -> Duration {
        Duration::from_millis(self.double_tap_delay_ms)
    }

    pub fn config_dir() -> Result<PathBuf, Box<dyn Error>> {
        // Check for XDG_CONFIG_HOME first (useful for testing)
        let config_dir = if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(xdg_config).join(APP_DIR)
        } else {
            dirs::config_dir()
                .ok_or("Unable to find config directory")?
                .join(APP_DIR)
        };
        Ok(config_dir)
    }

    pub fn config_path() -> Result<PathBuf, Box<dyn Error>> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn load() -> Result<Self, Box<dyn Error>> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Default::default());
        }

        let contents = fs::read_to_string(&config_path)?;
        let config: Config = toml::from_str(&contents)?;
        config
            .validate()
            .map_err(|e| format!("{}: {e}", config_path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), Box<dyn Error>> {
        let config_dir = Self::config_dir()?;

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)?;
        }

        let config_path = Self::config_path()?;
        let toml_string = toml::to_string_pretty(self)?;
        fs::write(&config_path, toml_string)?;

        Ok(())
    }

    pub fn exists() -> Result<bool, Box<dyn Error>> {
        Ok(Self::config_path()?.exists())
    }

    /// Range checks shared by `load` and `set_value`.
    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        check_millis("click_window_ms", self.click_window_ms)?;
        check_millis("double_tap_delay_ms", self.double_tap_delay_ms)?;
        check_level("gain", self.gain, GAIN_MAX)?;
        check_level("volume", self.volume, VOLUME_MAX)?;
        Ok(())
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        match key {
            "catalog" => {
                self.catalog = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                }
            }
            "gesture_policy" => self.gesture_policy = value.parse()?,
            "click_window_ms" => {
                let millis = parse_millis(value)?;
                check_millis(key, millis)?;
                self.click_window_ms = millis;
            }
            "double_tap_delay_ms" => {
                let millis = parse_millis(value)?;
                check_millis(key, millis)?;
                self.double_tap_delay_ms = millis;
            }
            "normalization" => {
                self.normalization = value
                    .parse::<bool>()
                    .map_err(|_| "Value must be 'true' or 'false'")?;
            }
            "routing" => {
                self.routing = value
                    .parse::<bool>()
                    .map_err(|_| "Value must be 'true' or 'false'")?;
            }
            "gain" => {
                let gain = parse_level(value)?;
                check_level(key, gain, GAIN_MAX)?;
                self.gain = gain;
            }
            "volume" => {
                let volume = parse_level(value)?;
                check_level(key, volume, VOLUME_MAX)?;
                self.volume = volume;
            }
            "log_file" => self.log_file = value.to_string(),
            _ => return Err(format!("Unknown configuration key: {key}").into()),
        }
        Ok(())
    }
}

fn parse_millis(value: &str) -> Result<u64, Box<dyn Error>> {
    value
        .parse::<u64>()
        .map_err(|_| "Value must be a whole number of milliseconds".into())
}

fn parse_level(value: &str) -> Result<f32, Box<dyn Error>> {
    value.parse::<f32>().map_err(|_| "Value must be a number".into())
}

fn check_millis(key: &str, millis: u64) -> Result<(), Box<dyn Error>> {
    if millis == 0 {
        return Err(format!("{key} must be greater than zero").into());
    }
    Ok(())
}

fn check_level(key: &str, level: f32, max: f32) -> Result<(), Box<dyn Error>> {
    if !(0.0..=max).contains(&level) {
        return Err(format!("{key} must be between 0 and {max}").into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Use a mutex to ensure tests that modify environment variables don't run concurrently
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_config_new() {
        let config = Config::new();
        assert_eq!(config.gesture_policy, GesturePolicy::Count);
        assert_eq!(config.click_window(), Duration::from_millis(600));
        assert_eq!(config.double_tap_delay(), Duration::from_millis(220));
        assert!(!config.normalization);
        assert_eq!(config.gain, 1.0);
        assert!(config.routing);
        assert!(config.catalog.is_none());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("gesture_policy = \"deferred\"\n").unwrap();
        assert_eq!(config.gesture_policy, GesturePolicy::Deferred);
        assert_eq!(config.click_window_ms, 600);
        assert_eq!(config.volume, 1.0);
        assert_eq!(config.log_file, DEFAULT_LOG_FILE);
    }

    #[test]
    fn test_gesture_policy_parse() {
        assert_eq!("count".parse::<GesturePolicy>(), Ok(GesturePolicy::Count));
        assert_eq!(
            "deferred".parse::<GesturePolicy>(),
            Ok(GesturePolicy::Deferred)
        );
        assert!("triple".parse::<GesturePolicy>().is_err());
        assert_eq!(GesturePolicy::Deferred.to_string(), "deferred");
    }

    #[test]
    fn test_set_value() {
        let mut config = Config::new();

        config.set_value("gesture_policy", "deferred").unwrap();
        assert_eq!(config.gesture_policy, GesturePolicy::Deferred);

        config.set_value("click_window_ms", "450").unwrap();
        assert_eq!(config.click_window_ms, 450);
        assert!(config.set_value("click_window_ms", "0").is_err());
        assert!(config.set_value("click_window_ms", "soon").is_err());

        config.set_value("normalization", "true").unwrap();
        assert!(config.normalization);
        assert!(config.set_value("normalization", "maybe").is_err());

        config.set_value("gain", "1.5").unwrap();
        assert_eq!(config.gain, 1.5);
        assert!(config.set_value("gain", "2.5").is_err());
        assert!(config.set_value("volume", "1.2").is_err());

        config.set_value("catalog", "~/clips/catalog.toml").unwrap();
        assert_eq!(config.catalog.as_deref(), Some("~/clips/catalog.toml"));
        config.set_value("catalog", "").unwrap();
        assert!(config.catalog.is_none());

        assert!(config.set_value("unknown_key", "value").is_err());
    }

    #[test]
    fn test_config_save_and_load() {
        let _guard = ENV_MUTEX.lock().unwrap();

        let temp_dir = TempDir::new().unwrap();
        let original_xdg = std::env::var("XDG_CONFIG_HOME").ok();
        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());
        }

        let mut config = Config::new();
        config.gesture_policy = GesturePolicy::Deferred;
        config.normalization = true;
        config.save().unwrap();

        let config_path = Config::config_path().unwrap();
        assert!(config_path.exists());
        assert!(config_path.starts_with(temp_dir.path().join(APP_DIR)));

        let loaded = Config::load().unwrap();
        assert_eq!(loaded, config);

        unsafe {
            if let Some(original) = original_xdg {
                std::env::set_var("XDG_CONFIG_HOME", original);
            } else {
                std::env::remove_var("XDG_CONFIG_HOME");
            }
        }
    }

    #[test]
    fn test_load_without_file_returns_default() {
        let _guard = ENV_MUTEX.lock().unwrap();

        let temp_dir = TempDir::new().unwrap();
        let original_xdg = std::env::var("XDG_CONFIG_HOME").ok();
        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());
        }

        assert!(!Config::exists().unwrap());
        assert_eq!(Config::load().unwrap(), Config::new());

        unsafe {
            if let Some(original) = original_xdg {
                std::env::set_var("XDG_CONFIG_HOME", original);
            } else {
                std::env::remove_var("XDG_CONFIG_HOME");
            }
        }
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let config: Config =
            toml::from_str("gain = -3.0\ndouble_tap_delay_ms = 0\nvolume = 7.0\n").unwrap();
        assert!(config.validate().is_err());

        let mut config = Config::new();
        assert!(config.validate().is_ok());
        config.double_tap_delay_ms = 0;
        assert!(config.validate().is_err());
        config.double_tap_delay_ms = 220;
        config.volume = 7.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let _guard = ENV_MUTEX.lock().unwrap();

        let temp_dir = TempDir::new().unwrap();
        let original_xdg = std::env::var("XDG_CONFIG_HOME").ok();
        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());
        }

        let config_dir = Config::config_dir().unwrap();
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(
            config_dir.join("config.toml"),
            "gain = -3.0\ndouble_tap_delay_ms = 0\n",
        )
        .unwrap();

        let err = Config::load().unwrap_err().to_string();
        assert!(err.contains("double_tap_delay_ms must be greater than zero"));

        unsafe {
            if let Some(original) = original_xdg {
                std::env::set_var("XDG_CONFIG_HOME", original);
            } else {
                std::env::remove_var("XDG_CONFIG_HOME");
            }
        }
    }
}
