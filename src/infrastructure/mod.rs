//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces,
//! integrating with cpal, symphonia, LAME and the XDG config directory.

use std::sync::Arc;

use crate::application::{Mp3EncodeSessionFactory, RecorderHost};

pub mod capture;
pub mod codec;
pub mod config;
pub mod decoding;

// Re-export adapters
pub use capture::{CpalMicrophone, FanOutTapHost, WavChunkRecorderHost};
pub use codec::LameCodecFactory;
pub use config::XdgConfigStore;
pub use decoding::SymphoniaDecoder;

/// Host wired to the default input device, encoding with LAME.
///
/// With `prefer_worker` unset, incremental encoding always runs inline.
pub fn default_host(prefer_worker: bool) -> RecorderHost {
    RecorderHost {
        microphone: Arc::new(CpalMicrophone::new()),
        chunked_recorder: Arc::new(WavChunkRecorderHost::new()),
        sample_tap: Arc::new(FanOutTapHost::new()),
        decoder: Arc::new(SymphoniaDecoder::new()),
        encoders: Arc::new(Mp3EncodeSessionFactory::new(
            Arc::new(LameCodecFactory::new()),
            prefer_worker,
        )),
    }
}
