//! Error types for bookcast.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BookcastError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("No .{extension} files found under {root}")]
    NoAudioFiles { root: String, extension: String },

    // External tool errors
    #[error("External tool not found: {tool}")]
    ToolNotFound { tool: String },

    #[error("Command failed: {command}\n{output}")]
    ToolFailed { command: String, output: String },

    #[error("Unexpected output from {tool}: {message}")]
    Parse { tool: String, message: String },

    // Run-level errors
    #[error("Episode {position} failed: {message}")]
    EpisodeFailed { position: usize, message: String },

    #[error("{} episode(s) failed: {}", .failed.len(), format_positions(.failed))]
    EpisodesFailed { failed: Vec<usize> },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

fn format_positions(positions: &[usize]) -> String {
    positions
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, BookcastError>;
