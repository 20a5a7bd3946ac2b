//! Tap Trainer - a terminal trial player for short audio clips.
//!
//! A grid of track buttons is driven by mouse taps. Depending on the
//! configured gesture policy, repeated taps on a button pause or restart
//! its clip, or a quick double tap restarts it. An optional dynamic range
//! compressor and an adjustable gain sit between the decoded clip and the
//! output device.

use clap::{CommandFactory, Parser, Subcommand, builder::PossibleValuesParser};
use clap_complete::{Generator, Shell, generate};
use std::error::Error;
use std::io;
use tap_trainer::config::GesturePolicy;

mod cli;

#[cfg(feature = "player")]
mod player;

#[derive(Parser)]
#[command(name = "tap-trainer")]
#[command(about = "Terminal trial player with tap gestures and live normalization")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Show or change configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// List the tracks of a catalog and check their sources
    Catalog {
        /// Catalog file (defaults to the configured or built-in catalog)
        #[arg(short, long)]
        catalog: Option<String>,
    },
    /// Open the track grid and start a listening session
    Play {
        /// Catalog file (defaults to the configured or built-in catalog)
        #[arg(short, long)]
        catalog: Option<String>,
        /// Gesture policy for this session
        #[arg(short, long)]
        policy: Option<GesturePolicy>,
    },
    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// View current configuration
    View,
    /// Set a configuration value
    Set {
        /// Configuration key
        #[arg(value_parser = PossibleValuesParser::new([
            "catalog",
            "gesture_policy",
            "click_window_ms",
            "double_tap_delay_ms",
            "normalization",
            "gain",
            "volume",
            "routing",
            "log_file",
        ]))]
        key: String,
        /// Configuration value
        value: String,
    },
    /// Edit configuration file in your editor
    Edit,
}

fn print_completions<G: Generator>(generator: G, cmd: &mut clap::Command) {
    generate(
        generator,
        cmd,
        cmd.get_name().to_string(),
        &mut io::stdout(),
    );
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            cli::init::handle_init()?;
        }
        Commands::Config { action } => match action {
            ConfigAction::View => {
                cli::config::handle_config_view()?;
            }
            ConfigAction::Set { key, value } => {
                cli::config::handle_config_set(&key, &value)?;
            }
            ConfigAction::Edit => {
                cli::config::handle_config_edit()?;
            }
        },
        Commands::Catalog { catalog } => {
            cli::catalog::handle_catalog(catalog.as_deref())?;
        }
        Commands::Play { catalog, policy } => {
            cli::play::handle_play(catalog.as_deref(), policy)?;
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            print_completions(shell, &mut cmd);
        }
    }

    Ok(())
}
