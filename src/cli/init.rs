use std::error::Error;
use tap_trainer::config::Config;

pub fn handle_init() -> Result<(), Box<dyn Error>> {
    if Config::exists()? {
        return Err(format!(
            "Tap Trainer is already initialized. Use 'tap-trainer config edit' to change {}",
            Config::config_path()?.display()
        )
        .into());
    }

    let config = Config::new();
    config.save()?;

    println!("Tap Trainer initialized successfully!");
    println!("Gesture policy: {}", config.gesture_policy);
    println!(
        "Configuration saved to: {}",
        Config::config_path()?.display()
    );

    Ok(())
}
