//! Session file support for stepgrid
//!
//! A session describes the tempo, grid width and initial channels the
//! player starts with. It is stored in TOML format at:
//! - Linux: `~/.config/stepgrid/session.toml`
//! - macOS: `~/Library/Application Support/stepgrid/session.toml`
//! - Windows: `%APPDATA%\stepgrid\session.toml`
//!
//! The file is input only. Pattern edits made while playing are never
//! written back.

use crate::error::{Error, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use stepgrid_core::{ChannelId, SequencerEvent, DEFAULT_STEPS_PER_CHANNEL};

/// Default tempo in BPM
pub const DEFAULT_BPM: f64 = 120.0;

/// Default steps per beat (16th notes)
pub const DEFAULT_STEPS_PER_BEAT: u32 = 4;

/// Main session structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tempo settings
    pub transport: TransportSettings,
    /// Grid settings
    pub pattern: PatternSettings,
    /// Channels registered on startup, in order
    pub channels: Vec<ChannelSettings>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: TransportSettings::default(),
            pattern: PatternSettings::default(),
            channels: vec![
                ChannelSettings::new(1, "kick", "x...x...x...x..."),
                ChannelSettings::new(2, "snare", "....x.......x..."),
                ChannelSettings::new(3, "hat", "x.x.x.x.x.x.x.x."),
            ],
        }
    }
}

impl Config {
    /// Load a session from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the session from the default file location
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Err(Error::Config(format!("Session file not found at {:?}", path)))
        }
    }

    /// Load the session or return the built-in default if there is none
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                log::debug!("Using default session: {}", e);
                Self::default()
            }
        }
    }

    /// Get the default session file path
    pub fn config_path() -> Result<PathBuf> {
        if let Some(proj_dirs) = ProjectDirs::from("", "", "stepgrid") {
            Ok(proj_dirs.config_dir().join("session.toml"))
        } else {
            Err(Error::Config("Could not determine config directory".to_string()))
        }
    }

    /// Create a default session file with comments
    pub fn create_default_config_file() -> Result<PathBuf> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = r#"# stepgrid session file

[transport]
# Tempo in beats per minute
bpm = 120.0

# Steps per beat (4 = 16th notes)
steps_per_beat = 4

[pattern]
# Number of steps in every channel's loop
steps_per_channel = 16

# One [[channels]] table per instrument, in playback order.
# Steps: x / X / 1 = on, . / - / 0 = off, spaces and | are ignored.
[[channels]]
id = 1
name = "kick"
steps = "x...|x...|x...|x..."

[[channels]]
id = 2
name = "snare"
steps = "....|x...|....|x..."

[[channels]]
id = 3
name = "hat"
steps = "x.x.|x.x.|x.x.|x.x."
"#;

        fs::write(&path, content)?;
        Ok(path)
    }

    /// Check the tempo and channel definitions: finite BPM, unique ids and
    /// parseable step strings
    pub fn validate(&self) -> Result<()> {
        if !self.transport.bpm.is_finite() {
            return Err(Error::Config(format!(
                "Tempo must be a finite number, got {}",
                self.transport.bpm
            )));
        }

        let mut seen = HashSet::new();
        for channel in &self.channels {
            if !seen.insert(channel.id) {
                return Err(Error::DuplicateChannel(channel.id));
            }
            channel.parse_steps()?;
        }
        Ok(())
    }

    /// The events that bring a fresh pattern store into this session's state
    pub fn setup_events(&self) -> Result<Vec<SequencerEvent>> {
        let mut events = vec![SequencerEvent::StepsPerChannelUpdate(
            self.pattern.steps_per_channel,
        )];

        for channel in &self.channels {
            let id = channel.channel_id();
            events.push(SequencerEvent::ChannelAdded(id));
            for (step, on) in channel.parse_steps()?.into_iter().enumerate() {
                if on {
                    events.push(SequencerEvent::UiStepToggled {
                        channel: id,
                        step,
                        on,
                    });
                }
            }
        }

        Ok(events)
    }
}

/// Tempo settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// Tempo in BPM
    pub bpm: f64,
    /// Steps per beat
    pub steps_per_beat: u32,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            steps_per_beat: DEFAULT_STEPS_PER_BEAT,
        }
    }
}

/// Grid settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternSettings {
    /// Width of every channel's loop
    pub steps_per_channel: usize,
}

impl Default for PatternSettings {
    fn default() -> Self {
        Self {
            steps_per_channel: DEFAULT_STEPS_PER_CHANNEL,
        }
    }
}

/// One channel definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSettings {
    /// Channel id
    pub id: u32,
    /// Display name (defaults to `ch<id>`)
    #[serde(default)]
    pub name: Option<String>,
    /// Step string, e.g. `"x...x..."`
    #[serde(default)]
    pub steps: String,
}

impl ChannelSettings {
    pub fn new(id: u32, name: &str, steps: &str) -> Self {
        Self {
            id,
            name: Some(name.to_string()),
            steps: steps.to_string(),
        }
    }

    pub fn channel_id(&self) -> ChannelId {
        ChannelId(self.id)
    }

    /// Name shown in the player output
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| format!("ch{}", self.id))
    }

    /// Parse the step string into on/off flags
    pub fn parse_steps(&self) -> Result<Vec<bool>> {
        parse_steps(self.id, &self.steps)
    }
}

/// Parse a step string.
///
/// `x`, `X` and `1` are on; `.`, `-` and `0` are off; whitespace and `|` are
/// separators. Positions in errors count characters from zero.
pub fn parse_steps(channel: u32, steps: &str) -> Result<Vec<bool>> {
    steps
        .chars()
        .enumerate()
        .filter(|(_, c)| !c.is_whitespace() && *c != '|')
        .map(|(position, c)| match c {
            'x' | 'X' | '1' => Ok(true),
            '.' | '-' | '0' => Ok(false),
            _ => Err(Error::Pattern {
                channel,
                character: c,
                position,
            }),
        })
        .collect()
}
