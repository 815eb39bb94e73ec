//! Finalization pipeline: live flush first, captured chunks as fallback

use tracing::{debug, info, warn};

use super::ports::{BlobDecoder, EncodeParams, EncodeSessionFactory};
use super::session::Session;
use crate::domain::error::RecorderError;
use crate::domain::recording::output::rounded_seconds;
use crate::domain::recording::Mp3Recording;

/// Produce the MP3 for a stopped session.
///
/// The live encoder wins when it received audio and its flush yields bytes.
/// Any live failure is logged and the chunk path takes over; only the
/// outcome of the chunk path is ever reported.
pub async fn finalize(
    session: &Session,
    decoder: &dyn BlobDecoder,
    encoders: &dyn EncodeSessionFactory,
) -> Result<Mp3Recording, RecorderError> {
    if let Some(recording) = flush_live(session).await {
        return Ok(recording);
    }
    encode_chunks(session, decoder, encoders).await
}

async fn flush_live(session: &Session) -> Option<Mp3Recording> {
    let (encoder, frames) = session.live()?.seal()?;
    if frames == 0 {
        encoder.close();
        return None;
    }

    let flushed = encoder.flush().await;
    encoder.close();
    match flushed {
        Ok(bytes) if !bytes.is_empty() => {
            let duration = rounded_seconds(frames, session.params().capture_rate);
            info!(
                session = session.id(),
                encoder = %encoder.kind(),
                frames,
                bytes = bytes.len(),
                "live encode finished"
            );
            Some(Mp3Recording::new(bytes, duration))
        }
        Ok(_) => {
            debug!(session = session.id(), "live flush produced no audio");
            None
        }
        Err(e) => {
            warn!(session = session.id(), error = %e, "live encode failed, using captured chunks");
            None
        }
    }
}

async fn encode_chunks(
    session: &Session,
    decoder: &dyn BlobDecoder,
    encoders: &dyn EncodeSessionFactory,
) -> Result<Mp3Recording, RecorderError> {
    let chunks = session.chunks();
    if chunks.is_empty() {
        return Err(RecorderError::TooShort);
    }

    let params = session.params();
    debug!(
        session = session.id(),
        chunks = chunks.len(),
        bytes = chunks.total_bytes(),
        "decoding captured chunks"
    );
    let decoded = decoder
        .decode(chunks.assemble(), params.target_rate)
        .await
        .map_err(|e| RecorderError::DecodeFailure(e.to_string()))?;
    if decoded.mono_pcm.is_empty() {
        return Err(RecorderError::TooShort);
    }

    let encoder = encoders
        .create(EncodeParams {
            source_rate: decoded.sample_rate,
            target_rate: params.target_rate,
            bitrate_kbps: params.bitrate_kbps,
        })
        .await
        .map_err(|e| RecorderError::EncoderFault(e.to_string()))?;
    encoder.append_pcm(&decoded.mono_pcm);
    let flushed = encoder.flush().await;
    encoder.close();
    let bytes = flushed.map_err(|e| RecorderError::EncoderFault(e.to_string()))?;

    let duration = rounded_seconds(decoded.mono_pcm.len() as u64, decoded.sample_rate);
    info!(
        session = session.id(),
        encoder = %encoder.kind(),
        bytes = bytes.len(),
        "chunk encode finished"
    );
    Ok(Mp3Recording::new(bytes, duration))
}

/// Reject output larger than `limit`; oversize bytes are dropped, never
/// truncated.
pub fn enforce_size_limit(recording: Mp3Recording, limit: u64) -> Result<Mp3Recording, RecorderError> {
    let size = recording.size_bytes();
    if size > limit {
        return Err(RecorderError::SizeExceeded { size, limit });
    }
    Ok(recording)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_limit_is_inclusive() {
        assert!(enforce_size_limit(Mp3Recording::new(vec![0; 100], 1), 100).is_ok());
        assert_eq!(
            enforce_size_limit(Mp3Recording::new(vec![0; 500], 1), 100).unwrap_err(),
            RecorderError::SizeExceeded {
                size: 500,
                limit: 100
            }
        );
    }
}
