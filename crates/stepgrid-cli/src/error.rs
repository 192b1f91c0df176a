//! Error types for the stepgrid command

use thiserror::Error;

/// Result type alias for stepgrid command operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading and running a session
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unparseable step string in a channel definition
    #[error("Channel {channel}: invalid step character {character:?} at position {position}")]
    Pattern {
        channel: u32,
        character: char,
        position: usize,
    },

    /// Two channel definitions share an id
    #[error("Channel {0} is defined more than once")]
    DuplicateChannel(u32),

    /// Bad `--duration` value
    #[error("Invalid duration: {0}")]
    InvalidDuration(#[from] humantime::DurationError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}
