//! Frame-aligned MP3 encoding over a codec port

use tracing::trace;

use super::pcm::to_i16;
use super::resample::StreamingResampler;
use crate::application::ports::{CodecConfig, CodecFactory, EncodeError, EncodeParams, PcmCodec};

/// Samples per MPEG layer III frame
pub const FRAME_SAMPLES: usize = 1152;

/// Resamples incoming PCM, cuts it into codec frames and accumulates the
/// compressed output. Owned by exactly one session.
pub struct FrameEncoder {
    codec: Box<dyn PcmCodec>,
    resampler: StreamingResampler,
    pending: Vec<i16>,
    output: Vec<u8>,
    frames_encoded: u64,
}

impl FrameEncoder {
    pub fn new(codecs: &dyn CodecFactory, params: EncodeParams) -> Result<Self, EncodeError> {
        let codec = codecs.create(CodecConfig {
            sample_rate: params.target_rate,
            bitrate_kbps: params.bitrate_kbps,
        })?;
        let resampler = StreamingResampler::new(params.source_rate, params.target_rate)?;

        Ok(Self {
            codec,
            resampler,
            pending: Vec::with_capacity(FRAME_SAMPLES * 2),
            output: Vec::new(),
            frames_encoded: 0,
        })
    }

    pub fn append(&mut self, samples: &[f32]) -> Result<(), EncodeError> {
        let resampled = self.resampler.push(samples)?;
        self.pending.extend(to_i16(&resampled));
        self.encode_full_frames()
    }

    /// Encode the tail and flush the codec, consuming the encoder
    pub fn finish(mut self) -> Result<Vec<u8>, EncodeError> {
        let tail = self.resampler.finish()?;
        self.pending.extend(to_i16(&tail));
        self.encode_full_frames()?;

        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            let bytes = self.codec.encode_frame(&rest)?;
            self.output.extend(bytes);
            self.frames_encoded += 1;
        }

        let trailer = self.codec.flush()?;
        self.output.extend(trailer);
        trace!(frames = self.frames_encoded, bytes = self.output.len(), "encoder finished");
        Ok(self.output)
    }

    #[cfg(test)]
    pub fn frames_encoded(&self) -> u64 {
        self.frames_encoded
    }

    fn encode_full_frames(&mut self) -> Result<(), EncodeError> {
        while self.pending.len() >= FRAME_SAMPLES {
            let frame: Vec<i16> = self.pending.drain(..FRAME_SAMPLES).collect();
            let bytes = self.codec.encode_frame(&frame)?;
            self.output.extend(bytes);
            self.frames_encoded += 1;
        }
        Ok(())
    }
}
