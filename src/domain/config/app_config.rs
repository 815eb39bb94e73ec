//! Application configuration value object

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;
use crate::domain::recording::options::{
    DEFAULT_BITRATE_KBPS, DEFAULT_MAX_SIZE_BYTES, DEFAULT_SAMPLE_RATE,
};
use crate::domain::recording::Duration;

/// Bitrates (kbps) the MP3 encoder accepts
pub const SUPPORTED_BITRATES: &[u32] = &[
    8, 16, 24, 32, 40, 48, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320,
];

/// Output sample rates (Hz) valid for MPEG-1/2/2.5 layer III
pub const SUPPORTED_SAMPLE_RATES: &[u32] = &[
    8_000, 11_025, 12_000, 16_000, 22_050, 24_000, 32_000, 44_100, 48_000,
];

/// Where incremental encoding runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EncoderPreference {
    /// Dedicated encoder thread, falling back to inline on failure
    #[default]
    Worker,
    /// Always encode on the async runtime
    Inline,
}

impl EncoderPreference {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Worker => "worker",
            Self::Inline => "inline",
        }
    }
}

impl fmt::Display for EncoderPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EncoderPreference {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "worker" => Ok(Self::Worker),
            "inline" => Ok(Self::Inline),
            _ => Err(ConfigError::ValidationError {
                key: "encoder".to_string(),
                message: "Value must be 'worker' or 'inline'".to_string(),
            }),
        }
    }
}

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub max_duration: Option<String>,
    pub max_size_bytes: Option<u64>,
    pub bitrate: Option<u32>,
    pub sample_rate: Option<u32>,
    pub encoder: Option<String>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            max_duration: Some(Duration::default_max_duration().to_string()),
            max_size_bytes: Some(DEFAULT_MAX_SIZE_BYTES),
            bitrate: Some(DEFAULT_BITRATE_KBPS),
            sample_rate: Some(DEFAULT_SAMPLE_RATE),
            encoder: Some(EncoderPreference::default().to_string()),
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            max_duration: other.max_duration.or(self.max_duration),
            max_size_bytes: other.max_size_bytes.or(self.max_size_bytes),
            bitrate: other.bitrate.or(self.bitrate),
            sample_rate: other.sample_rate.or(self.sample_rate),
            encoder: other.encoder.or(self.encoder),
        }
    }

    pub fn max_size_or_default(&self) -> u64 {
        self.max_size_bytes
            .filter(|&size| size > 0)
            .unwrap_or(DEFAULT_MAX_SIZE_BYTES)
    }

    /// Configured bitrate if supported, otherwise the default
    pub fn bitrate_or_default(&self) -> u32 {
        self.bitrate
            .filter(|b| SUPPORTED_BITRATES.contains(b))
            .unwrap_or(DEFAULT_BITRATE_KBPS)
    }

    /// Configured sample rate if supported, otherwise the default
    pub fn sample_rate_or_default(&self) -> u32 {
        self.sample_rate
            .filter(|r| SUPPORTED_SAMPLE_RATES.contains(r))
            .unwrap_or(DEFAULT_SAMPLE_RATE)
    }
}

pub fn validate_bitrate(value: u32) -> Result<u32, ConfigError> {
    if SUPPORTED_BITRATES.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::ValidationError {
            key: "bitrate".to_string(),
            message: format!("Supported bitrates (kbps): {}", join(SUPPORTED_BITRATES)),
        })
    }
}

pub fn validate_sample_rate(value: u32) -> Result<u32, ConfigError> {
    if SUPPORTED_SAMPLE_RATES.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::ValidationError {
            key: "sample_rate".to_string(),
            message: format!("Supported sample rates (Hz): {}", join(SUPPORTED_SAMPLE_RATES)),
        })
    }
}

fn join(values: &[u32]) -> String {
    values
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
