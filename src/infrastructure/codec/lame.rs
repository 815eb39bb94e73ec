//! MP3 codec using the embedded LAME library

use mp3lame_encoder::{Bitrate, Builder, Encoder, FlushNoGap, MonoPcm, Quality};
use tracing::debug;

use crate::application::ports::{CodecConfig, CodecError, CodecFactory, PcmCodec};

/// Bytes LAME may emit on flush
const FLUSH_BUFFER_SIZE: usize = 7200;

/// Map a kbps value onto the closest LAME bitrate not above it
fn bitrate_for(kbps: u32) -> Bitrate {
    match kbps {
        320.. => Bitrate::Kbps320,
        256.. => Bitrate::Kbps256,
        224.. => Bitrate::Kbps224,
        192.. => Bitrate::Kbps192,
        160.. => Bitrate::Kbps160,
        128.. => Bitrate::Kbps128,
        112.. => Bitrate::Kbps112,
        96.. => Bitrate::Kbps96,
        80.. => Bitrate::Kbps80,
        64.. => Bitrate::Kbps64,
        48.. => Bitrate::Kbps48,
        40.. => Bitrate::Kbps40,
        32.. => Bitrate::Kbps32,
        24.. => Bitrate::Kbps24,
        16.. => Bitrate::Kbps16,
        _ => Bitrate::Kbps8,
    }
}

/// Builds mono LAME encoders
#[derive(Debug, Default)]
pub struct LameCodecFactory;

impl LameCodecFactory {
    pub fn new() -> Self {
        Self
    }
}

impl CodecFactory for LameCodecFactory {
    fn create(&self, config: CodecConfig) -> Result<Box<dyn PcmCodec>, CodecError> {
        let mut builder = Builder::new()
            .ok_or_else(|| CodecError::Config("Failed to create LAME builder".to_string()))?;

        builder
            .set_num_channels(1)
            .map_err(|e| CodecError::Config(format!("Failed to set channels: {:?}", e)))?;
        builder
            .set_sample_rate(config.sample_rate)
            .map_err(|e| CodecError::Config(format!("Failed to set sample rate: {:?}", e)))?;
        builder
            .set_brate(bitrate_for(config.bitrate_kbps))
            .map_err(|e| CodecError::Config(format!("Failed to set bitrate: {:?}", e)))?;
        builder
            .set_quality(Quality::Best)
            .map_err(|e| CodecError::Config(format!("Failed to set quality: {:?}", e)))?;

        let encoder = builder
            .build()
            .map_err(|e| CodecError::Config(format!("Failed to initialize LAME: {:?}", e)))?;
        debug!(
            sample_rate = config.sample_rate,
            bitrate_kbps = config.bitrate_kbps,
            "LAME encoder created"
        );
        Ok(Box::new(LameCodec { encoder }))
    }
}

pub struct LameCodec {
    encoder: Encoder,
}

impl PcmCodec for LameCodec {
    fn encode_frame(&mut self, samples: &[i16]) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(mp3lame_encoder::max_required_buffer_size(samples.len()));
        let written = self
            .encoder
            .encode(MonoPcm(samples), out.spare_capacity_mut())
            .map_err(|e| CodecError::Encode(format!("{:?}", e)))?;
        // SAFETY: `encode` initialized exactly `written` bytes of the spare capacity
        unsafe {
            out.set_len(written);
        }
        Ok(out)
    }

    fn flush(&mut self) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(FLUSH_BUFFER_SIZE);
        let written = self
            .encoder
            .flush::<FlushNoGap>(out.spare_capacity_mut())
            .map_err(|e| CodecError::Flush(format!("{:?}", e)))?;
        // SAFETY: `flush` initialized exactly `written` bytes of the spare capacity
        unsafe {
            out.set_len(written);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitrates_snap_down() {
        assert!(matches!(bitrate_for(64), Bitrate::Kbps64));
        assert!(matches!(bitrate_for(65), Bitrate::Kbps64));
        assert!(matches!(bitrate_for(1000), Bitrate::Kbps320));
        assert!(matches!(bitrate_for(0), Bitrate::Kbps8));
    }

    #[test]
    fn encodes_a_second_of_tone() {
        let mut codec = LameCodecFactory::new()
            .create(CodecConfig {
                sample_rate: 44_100,
                bitrate_kbps: 64,
            })
            .unwrap();

        let tone: Vec<i16> = (0..44_100)
            .map(|i| ((i as f32 * 440.0 * std::f32::consts::TAU / 44_100.0).sin() * 8000.0) as i16)
            .collect();
        let mut bytes = Vec::new();
        for frame in tone.chunks(1152) {
            bytes.extend(codec.encode_frame(frame).unwrap());
        }
        bytes.extend(codec.flush().unwrap());

        // 64 kbps for one second is about 8 KB
        assert!(bytes.len() > 6_000 && bytes.len() < 12_000, "{} bytes", bytes.len());
    }
}
