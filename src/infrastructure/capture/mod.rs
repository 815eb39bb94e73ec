//! Capture adapters
//!
//! The cpal microphone publishes mono PCM; the chunked recorder and the
//! sample tap are both built on that stream's fan-out.

mod cpal_microphone;
mod fan_out_tap;
mod wav_chunk_recorder;

pub use cpal_microphone::CpalMicrophone;
pub use fan_out_tap::{FanOutTap, FanOutTapHost};
pub use wav_chunk_recorder::{wav_header, WavChunkRecorder, WavChunkRecorderHost};
