//! stepgrid - headless step sequencer
//!
//! Loads a session file, wires the pattern store to an in-process bus and
//! prints which channels fire on every step.

mod clock;
mod config;
mod error;
mod player;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::stdout;
use std::path::PathBuf;

use clock::StepClock;
use config::Config;
use player::Player;

const DEFAULT_STEPS: u64 = 32;

#[derive(Parser, Debug)]
#[command(name = "stepgrid")]
#[command(author, version, about = "Headless step sequencer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a session
    Play {
        /// Session file (default: ~/.config/stepgrid/session.toml)
        #[arg(value_name = "SESSION")]
        session: Option<PathBuf>,

        /// Tempo in BPM (overrides the session)
        #[arg(long)]
        bpm: Option<f64>,

        /// Steps per channel (overrides the session)
        #[arg(long)]
        steps: Option<usize>,

        /// Number of steps to play
        #[arg(short, long, conflicts_with = "duration")]
        ticks: Option<u64>,

        /// How long to play, e.g. "8s" or "1m"
        #[arg(short, long)]
        duration: Option<String>,
    },
    /// Create a default session file
    Init,
    /// Show the session file path
    ConfigPath,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            let path = Config::create_default_config_file()?;
            println!("Created default session at: {}", path.display());
            Ok(())
        }
        Commands::ConfigPath => {
            let path = Config::config_path()?;
            println!("{}", path.display());
            Ok(())
        }
        Commands::Play {
            session,
            bpm,
            steps,
            ticks,
            duration,
        } => {
            let mut config = match session {
                Some(path) => Config::load_from(&path)
                    .with_context(|| format!("Failed to load session {}", path.display()))?,
                None => Config::load_or_default(),
            };

            // Apply CLI overrides
            if let Some(bpm) = bpm {
                config.transport.bpm = bpm;
            }
            if let Some(steps) = steps {
                config.pattern.steps_per_channel = steps;
            }
            config.validate()?;

            let clock = StepClock::from_settings(&config.transport);
            let total = match duration {
                Some(text) => {
                    let duration =
                        humantime::parse_duration(&text).map_err(error::Error::from)?;
                    clock.steps_in(duration)
                }
                None => ticks.unwrap_or(DEFAULT_STEPS),
            };

            let player = Player::new(&config)?;
            player.run(&clock, total, &mut stdout().lock())
        }
    }
}
