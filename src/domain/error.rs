//! Domain error types

use thiserror::Error;

/// Error when parsing a duration string
#[derive(Debug, Clone, Error)]
#[error("Invalid duration format: \"{input}\". Expected format: <number>s, <number>m, or <number>m<number>s (e.g., 30s, 10m, 2m30s)")]
pub struct DurationParseError {
    pub input: String,
}

/// Error when configuration fails
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    #[error("Invalid config value for '{key}': {message}")]
    ValidationError { key: String, message: String },

    #[error("Config file already exists at: {0}")]
    AlreadyExists(String),
}

/// Terminal outcomes of a recording attempt.
///
/// The `Display` text is what ends up in the `error` field of the state
/// snapshot, so every message is written for an end user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecorderError {
    #[error("{0}")]
    CapabilityUnavailable(String),

    #[error("Microphone permission denied. Allow microphone access and try again.")]
    PermissionDenied,

    #[error("Recording too short. Please record for at least a moment before stopping.")]
    TooShort,

    #[error("Could not process the recording ({0}). Please try again or use a different input device.")]
    DecodeFailure(String),

    #[error("Recording is too large ({size} bytes, limit is {limit} bytes). Please record a shorter clip.")]
    SizeExceeded { size: u64, limit: u64 },

    #[error("MP3 encoding failed: {0}")]
    EncoderFault(String),

    #[error("Recording was cancelled")]
    Cancelled,
}

impl RecorderError {
    /// Message used when the host has no microphone capability at all
    pub fn microphone_unavailable() -> Self {
        Self::CapabilityUnavailable(
            "Microphone access is not available on this system.".to_string(),
        )
    }

    /// Message used when neither capture path could be started
    pub fn recording_unsupported() -> Self {
        Self::CapabilityUnavailable("Audio recording is not supported on this system.".to_string())
    }
}
