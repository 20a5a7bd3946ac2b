use owo_colors::OwoColorize;
use std::error::Error;
use std::path::Path;
use tap_trainer::catalog::Catalog;
use tap_trainer::config::Config;

/// Catalog path from the command line, falling back to the config file.
pub fn resolve_catalog(catalog: Option<&str>, config: &Config) -> Result<Catalog, Box<dyn Error>> {
    let path = catalog.or(config.catalog.as_deref());
    Ok(Catalog::load_or_builtin(path)?)
}

pub fn handle_catalog(catalog: Option<&str>) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let catalog = resolve_catalog(catalog, &config)?;

    println!("{} {} tracks", "🎵".cyan(), catalog.len().to_string().bold());
    println!();

    let mut missing = 0;
    for track in catalog.tracks() {
        let exists = Path::new(&track.source).exists();
        let marker = if !track.has_supported_extension() {
            "unsupported".yellow().to_string()
        } else if !exists {
            missing += 1;
            "missing".red().to_string()
        } else {
            "ok".green().to_string()
        };
        println!(
            "  {:>3}  {:<12} {}  [{}]",
            track.id,
            track.label.bold(),
            track.source.dimmed(),
            marker
        );
    }

    if missing > 0 {
        println!();
        println!(
            "{} {missing} source(s) not found on disk",
            "Warning:".yellow()
        );
    }

    Ok(())
}
