use std::error::Error;
use tap_trainer::config::GesturePolicy;

pub fn handle_play(
    catalog: Option<&str>,
    policy: Option<GesturePolicy>,
) -> Result<(), Box<dyn Error>> {
    #[cfg(feature = "player")]
    {
        let config = tap_trainer::config::Config::load()?;
        let catalog = super::catalog::resolve_catalog(catalog, &config)?;
        let policy = policy.unwrap_or(config.gesture_policy);
        crate::player::run(&config, catalog, policy)
    }

    #[cfg(not(feature = "player"))]
    {
        let _ = catalog;
        let _ = policy;
        use owo_colors::OwoColorize;
        println!("{} {}", "🎵".cyan(), "Tap Trainer".bold());
        println!();
        println!(
            "{} The player requires the 'player' feature to be enabled.",
            "Note:".yellow()
        );
        println!();
        println!("To enable it, install with:");
        println!("  {}", "cargo install tap-trainer --features player".cyan());
        println!();
        println!("Or if building from source:");
        println!("  {}", "cargo build --release --features player".cyan());

        Ok(())
    }
}
