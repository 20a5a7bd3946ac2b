use owo_colors::OwoColorize;
use std::error::Error;
use std::process::Command;
use tap_trainer::config::{Config, GesturePolicy};

/// Key/value pairs in the order `config view` prints them.
fn entries(config: &Config) -> Vec<(&'static str, String)> {
    vec![
        (
            "catalog",
            config
                .catalog
                .clone()
                .unwrap_or_else(|| "(built-in)".to_string()),
        ),
        ("gesture_policy", config.gesture_policy.to_string()),
        ("click_window_ms", config.click_window_ms.to_string()),
        ("double_tap_delay_ms", config.double_tap_delay_ms.to_string()),
        ("normalization", config.normalization.to_string()),
        ("gain", config.gain.to_string()),
        ("volume", config.volume.to_string()),
        ("routing", config.routing.to_string()),
        ("log_file", config.log_file.clone()),
    ]
}

/// One-line description of how taps will be read.
fn gesture_summary(config: &Config) -> String {
    match config.gesture_policy {
        GesturePolicy::Count => format!(
            "count policy: taps within {} ms accumulate (2 = pause, 3 = restart)",
            config.click_window_ms
        ),
        GesturePolicy::Deferred => format!(
            "deferred policy: a second tap within {} ms restarts",
            config.double_tap_delay_ms
        ),
    }
}

pub fn handle_config_view() -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;

    println!("Current Tap Trainer configuration:");
    for (key, value) in entries(&config) {
        println!("  {}: {}", key.bold(), value);
    }
    println!();
    println!("  {}", gesture_summary(&config).dimmed());

    Ok(())
}

pub fn handle_config_set(key: &str, value: &str) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load()?;

    config.set_value(key, value)?;
    config.save()?;

    let stored = entries(&config)
        .into_iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
        .unwrap_or_else(|| value.to_string());
    println!("Configuration updated: {key} = {stored}");
    if matches!(key, "gesture_policy" | "click_window_ms" | "double_tap_delay_ms") {
        println!("  {}", gesture_summary(&config).dimmed());
    }

    Ok(())
}

pub fn handle_config_edit() -> Result<(), Box<dyn Error>> {
    if !Config::exists()? {
        return Err("Tap Trainer not initialized. Run 'tap-trainer init' first.".into());
    }

    let config_path = Config::config_path()?;
    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    println!("Opening {} in {}", config_path.display(), editor);

    let status = Command::new(&editor)
        .arg(&config_path)
        .status()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                format!("Editor '{editor}' not found. Set $EDITOR to a valid editor path.")
            } else {
                format!("Failed to launch editor '{editor}': {e}")
            }
        })?;

    if !status.success() {
        return Err(format!("Editor '{editor}' exited with error").into());
    }

    // Load applies the same range checks as `config set`
    match Config::load() {
        Ok(config) => {
            println!("Configuration saved successfully");
            println!("  {}", gesture_summary(&config).dimmed());
        }
        Err(e) => {
            return Err(format!(
                "Configuration validation failed: {e}\n\
                 The player will not start until the file is fixed \
                 (or use 'tap-trainer config set <key> <value>')."
            )
            .into());
        }
    }

    Ok(())
}
