//! Streaming sample-rate conversion for the incremental encoder

use rubato::{FftFixedIn, Resampler};

use crate::application::ports::EncodeError;

const CHUNK_SIZE: usize = 1024;
const SUB_CHUNKS: usize = 2;

/// Converts mono PCM from `source_rate` to `target_rate` in arbitrary-size
/// pieces. Output is delay-compensated: the first emitted sample lines up
/// with the first input sample, and `finish` trims to the exact length.
pub struct StreamingResampler {
    inner: Option<FftFixedIn<f32>>,
    ratio: f64,
    pending: Vec<f32>,
    frames_in: u64,
    emitted: u64,
    skip: usize,
}

impl StreamingResampler {
    pub fn new(source_rate: u32, target_rate: u32) -> Result<Self, EncodeError> {
        if source_rate == 0 || target_rate == 0 {
            return Err(EncodeError::Resample(format!(
                "Invalid rates {} -> {}",
                source_rate, target_rate
            )));
        }

        let inner = if source_rate == target_rate {
            None
        } else {
            Some(
                FftFixedIn::<f32>::new(
                    source_rate as usize,
                    target_rate as usize,
                    CHUNK_SIZE,
                    SUB_CHUNKS,
                    1,
                )
                .map_err(|e| EncodeError::Resample(format!("Resampler init failed: {}", e)))?,
            )
        };
        let skip = inner.as_ref().map(|r| r.output_delay()).unwrap_or(0);

        Ok(Self {
            inner,
            ratio: f64::from(target_rate) / f64::from(source_rate),
            pending: Vec::new(),
            frames_in: 0,
            emitted: 0,
            skip,
        })
    }

    #[cfg(test)]
    pub fn is_passthrough(&self) -> bool {
        self.inner.is_none()
    }

    /// Feed samples; returns whatever output is ready
    pub fn push(&mut self, samples: &[f32]) -> Result<Vec<f32>, EncodeError> {
        self.frames_in += samples.len() as u64;
        if self.inner.is_none() {
            self.emitted += samples.len() as u64;
            return Ok(samples.to_vec());
        }

        self.pending.extend_from_slice(samples);
        let mut out = Vec::new();
        while let Some(needed) = self.inner.as_ref().map(|r| r.input_frames_next()) {
            if self.pending.len() < needed {
                break;
            }
            let chunk: Vec<f32> = self.pending.drain(..needed).collect();
            self.process(chunk, &mut out)?;
        }
        Ok(out)
    }

    /// Drain the remaining input, padding with silence, and trim the output
    /// to `ceil(frames_in * ratio)` samples in total.
    pub fn finish(&mut self) -> Result<Vec<f32>, EncodeError> {
        let expected = (self.frames_in as f64 * self.ratio).ceil() as u64;
        let mut out = Vec::new();
        if self.inner.is_none() {
            return Ok(out);
        }

        while self.emitted < expected {
            let Some(needed) = self.inner.as_ref().map(|r| r.input_frames_next()) else {
                break;
            };
            let take = self.pending.len().min(needed);
            let mut chunk: Vec<f32> = self.pending.drain(..take).collect();
            chunk.resize(needed, 0.0);
            self.process(chunk, &mut out)?;
        }

        let overshoot = self.emitted.saturating_sub(expected) as usize;
        out.truncate(out.len().saturating_sub(overshoot));
        self.emitted = expected;
        Ok(out)
    }

    fn process(&mut self, chunk: Vec<f32>, out: &mut Vec<f32>) -> Result<(), EncodeError> {
        let Some(resampler) = self.inner.as_mut() else {
            return Ok(());
        };
        let wave_in = vec![chunk];
        let processed = resampler
            .process(&wave_in, None)
            .map_err(|e| EncodeError::Resample(format!("Resampling failed: {}", e)))?;

        let mut channel = processed.into_iter().next().unwrap_or_default();
        if self.skip > 0 {
            let dropped = self.skip.min(channel.len());
            channel.drain(..dropped);
            self.skip -= dropped;
        }
        self.emitted += channel.len() as u64;
        out.extend(channel);
        Ok(())
    }
}
