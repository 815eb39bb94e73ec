//! Domain layer - Core recording logic
//!
//! Contains value objects, the recorder lifecycle, and domain errors.
//! This layer has no dependencies on external systems.

pub mod config;
pub mod error;
pub mod recording;

// Re-export common types
pub use config::{AppConfig, EncoderPreference};
pub use error::*;
pub use recording::{
    Duration, Lifecycle, Mp3Recording, Phase, RecorderOptions, RecorderState, RecordingMetadata,
};
