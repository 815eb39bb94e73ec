//! PCM codec port interfaces

use thiserror::Error;

/// Codec errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Codec configuration rejected: {0}")]
    Config(String),

    #[error("Frame encoding failed: {0}")]
    Encode(String),

    #[error("Codec flush failed: {0}")]
    Flush(String),
}

/// Settings for a single codec instance (always mono)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    pub sample_rate: u32,
    pub bitrate_kbps: u32,
}

/// A compressed-audio encoder: PCM frames in, compressed frames out.
pub trait PcmCodec: Send {
    /// Encode one frame of mono samples; may return zero bytes while the
    /// codec buffers internally.
    fn encode_frame(&mut self, samples: &[i16]) -> Result<Vec<u8>, CodecError>;

    /// Emit trailing bytes and finalize the stream
    fn flush(&mut self) -> Result<Vec<u8>, CodecError>;
}

/// Creates codec instances; shared with the encoder thread
pub trait CodecFactory: Send + Sync {
    fn create(&self, config: CodecConfig) -> Result<Box<dyn PcmCodec>, CodecError>;
}
