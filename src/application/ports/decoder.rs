//! Blob decode port interface

use async_trait::async_trait;
use thiserror::Error;

/// Decoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unsupported audio format: {0}")]
    Unsupported(String),

    #[error("malformed audio data: {0}")]
    Malformed(String),

    #[error("resampling failed: {0}")]
    Resample(String),
}

/// Mono PCM recovered from the assembled chunks
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub mono_pcm: Vec<f32>,
    pub sample_rate: u32,
    pub duration_secs: f64,
}

/// Port for decoding an assembled blob to mono PCM
#[async_trait]
pub trait BlobDecoder: Send + Sync {
    /// Decode `bytes` and resample to `target_rate`.
    /// Multi-channel sources are averaged to mono per sample.
    async fn decode(&self, bytes: Vec<u8>, target_rate: u32) -> Result<DecodedAudio, DecodeError>;
}
