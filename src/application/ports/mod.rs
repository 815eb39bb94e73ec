//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the recorder core
//! and the host that provides microphones, codecs and decoders.

pub mod chunked_recorder;
pub mod codec;
pub mod config;
pub mod decoder;
pub mod encode_session;
pub mod microphone;
pub mod sample_tap;

// Re-export common types
pub use chunked_recorder::{ChunkCallback, ChunkedRecorderHost, NativeChunkedRecorder, StoppedCallback};
pub use codec::{CodecConfig, CodecError, CodecFactory, PcmCodec};
pub use config::ConfigStore;
pub use decoder::{BlobDecoder, DecodeError, DecodedAudio};
pub use encode_session::{
    EncodeError, EncodeParams, EncodeSession, EncodeSessionFactory, EncoderKind,
};
pub use microphone::{CaptureError, MicrophoneAccess, MicrophoneStream};
pub use sample_tap::{BufferCallback, NativeSampleTap, SampleTapHost};
