//! Visualization bins

/// Number of bins in `RecorderState::audio_levels`
pub const LEVEL_BINS: usize = 40;

/// Fold a mono buffer into `LEVEL_BINS` peak values scaled to 0..=255.
///
/// Buffers shorter than the bin count spread their samples over the first
/// bins and leave the rest at zero.
pub fn peak_bins(samples: &[f32]) -> Vec<u8> {
    let mut bins = vec![0u8; LEVEL_BINS];
    if samples.is_empty() {
        return bins;
    }

    let per_bin = samples.len().div_ceil(LEVEL_BINS);
    for (bin, chunk) in bins.iter_mut().zip(samples.chunks(per_bin)) {
        let peak = chunk.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        *bin = (peak.min(1.0) * 255.0).round() as u8;
    }
    bins
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_is_flat() {
        assert_eq!(peak_bins(&[0.0; 4096]), vec![0; LEVEL_BINS]);
    }

    #[test]
    fn full_scale_saturates() {
        let bins = peak_bins(&[1.5; 4096]);
        assert!(bins.iter().all(|&b| b == 255));
    }

    #[test]
    fn peaks_land_in_their_bin() {
        let mut samples = vec![0.0f32; 400];
        samples[0] = -0.5;
        samples[399] = 1.0;
        let bins = peak_bins(&samples);
        assert_eq!(bins[0], 128);
        assert_eq!(bins[LEVEL_BINS - 1], 255);
        assert_eq!(bins[20], 0);
    }

    #[test]
    fn short_and_empty_buffers() {
        assert_eq!(peak_bins(&[]).len(), LEVEL_BINS);
        let bins = peak_bins(&[1.0, 1.0]);
        assert_eq!(&bins[..2], &[255, 255]);
        assert_eq!(bins[2], 0);
    }
}
