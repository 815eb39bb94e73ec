//! Incremental encode session port interfaces

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::codec::CodecError;

/// Encode session errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("Encoder worker did not become ready within {0:?}")]
    InitTimeout(Duration),

    #[error("Encoder worker failed: {0}")]
    Worker(String),

    #[error("Encoder unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Resampler failed: {0}")]
    Resample(String),

    #[error("A flush is already in progress")]
    FlushInProgress,

    #[error("Encode session is not initialized")]
    NotInitialized,

    #[error("Encode session is closed")]
    Closed,

    #[error("Encoder faulted earlier: {0}")]
    Faulted(String),
}

/// Parameters of one encode session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams {
    /// Rate of the PCM passed to `append_pcm`
    pub source_rate: u32,
    /// Rate of the MP3 output
    pub target_rate: u32,
    pub bitrate_kbps: u32,
}

/// Which implementation hosts the codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncoderKind {
    Worker,
    Inline,
}

impl fmt::Display for EncoderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Worker => write!(f, "worker"),
            Self::Inline => write!(f, "inline"),
        }
    }
}

/// Incremental MP3 encoder.
///
/// Appends are fire-and-forget but strictly ordered; a flush observes every
/// append issued before it and none issued after. At most one flush may be
/// outstanding, and a completed flush finalizes the session.
#[async_trait]
pub trait EncodeSession: Send + Sync {
    async fn initialize(&self) -> Result<(), EncodeError>;

    /// Queue mono samples at the source rate. The input is copied.
    fn append_pcm(&self, samples: &[f32]);

    async fn flush(&self) -> Result<Vec<u8>, EncodeError>;

    /// Release the codec. Idempotent.
    fn close(&self);

    fn kind(&self) -> EncoderKind;
}

/// Port for creating initialized encode sessions
#[async_trait]
pub trait EncodeSessionFactory: Send + Sync {
    async fn create(&self, params: EncodeParams) -> Result<Arc<dyn EncodeSession>, EncodeError>;
}
