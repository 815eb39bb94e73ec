//! Blob decoder using symphonia

use std::io::Cursor;

use async_trait::async_trait;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::application::encoding::resample::StreamingResampler;
use crate::application::ports::{BlobDecoder, DecodeError, DecodedAudio};

/// Decodes any container symphonia can probe, then resamples to the
/// requested rate. Runs on the blocking pool.
#[derive(Debug, Default)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self
    }

    fn decode_blocking(mut bytes: Vec<u8>, target_rate: u32) -> Result<DecodedAudio, DecodeError> {
        let mut hint = Hint::new();
        if repair_streaming_wav(&mut bytes) {
            hint.with_extension("wav");
        }

        let source = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                source,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| DecodeError::Unsupported(e.to_string()))?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| DecodeError::Unsupported("no audio track".to_string()))?;
        let track_id = track.id;
        let source_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| DecodeError::Malformed("unknown sample rate".to_string()))?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| DecodeError::Unsupported(e.to_string()))?;

        let mut mono = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(DecodeError::Malformed(e.to_string())),
            };
            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let channels = spec.channels.count().max(1);
                    let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    buffer.copy_interleaved_ref(decoded);
                    mono.extend(
                        buffer
                            .samples()
                            .chunks(channels)
                            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
                    );
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!(error = %e, "skipping undecodable packet");
                }
                Err(e) => return Err(DecodeError::Malformed(e.to_string())),
            }
        }
        debug!(source_rate, samples = mono.len(), "blob decoded");

        let mono_pcm = resample(&mono, source_rate, target_rate)?;
        let duration_secs = mono_pcm.len() as f64 / f64::from(target_rate);
        Ok(DecodedAudio {
            mono_pcm,
            sample_rate: target_rate,
            duration_secs,
        })
    }
}

fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Result<Vec<f32>, DecodeError> {
    let mut resampler = StreamingResampler::new(source_rate, target_rate)
        .map_err(|e| DecodeError::Resample(e.to_string()))?;
    let mut out = resampler
        .push(samples)
        .map_err(|e| DecodeError::Resample(e.to_string()))?;
    out.extend(
        resampler
            .finish()
            .map_err(|e| DecodeError::Resample(e.to_string()))?,
    );
    Ok(out)
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let field = bytes.get(at..at + 4)?;
    Some(u32::from_le_bytes([field[0], field[1], field[2], field[3]]))
}

/// Rewrite the RIFF and data chunk sizes of a WAV written without knowing
/// its final length. Returns whether the bytes are a RIFF/WAVE file.
pub fn repair_streaming_wav(bytes: &mut [u8]) -> bool {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return false;
    }
    let riff_size = (bytes.len() - 8) as u32;
    bytes[4..8].copy_from_slice(&riff_size.to_le_bytes());

    let mut pos = 12;
    while pos + 8 <= bytes.len() {
        let Some(size) = read_u32(bytes, pos + 4) else {
            break;
        };
        if &bytes[pos..pos + 4] == b"data" {
            let actual = (bytes.len() - pos - 8) as u32;
            bytes[pos + 4..pos + 8].copy_from_slice(&actual.to_le_bytes());
            break;
        }
        let size = size as usize;
        pos += 8 + size + (size & 1);
    }
    true
}

#[async_trait]
impl BlobDecoder for SymphoniaDecoder {
    async fn decode(&self, bytes: Vec<u8>, target_rate: u32) -> Result<DecodedAudio, DecodeError> {
        tokio::task::spawn_blocking(move || Self::decode_blocking(bytes, target_rate))
            .await
            .map_err(|e| DecodeError::Malformed(format!("decode task failed: {}", e)))?
    }
}
