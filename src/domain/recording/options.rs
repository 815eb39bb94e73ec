//! Recorder configuration

use std::fmt;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use super::duration::Duration;
use super::output::RecordingMetadata;

/// Default output ceiling (25 MiB)
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 26_214_400;

/// Default MP3 bitrate in kbps
pub const DEFAULT_BITRATE_KBPS: u32 = 64;

/// Default MP3 sample rate in Hz
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Default interval of the elapsed-time poll
pub const DEFAULT_ELAPSED_POLL: StdDuration = StdDuration::from_millis(250);

/// Default chunk period requested from the native chunked recorder
pub const DEFAULT_TIMESLICE: StdDuration = StdDuration::from_millis(1000);

/// Default size of buffers delivered by the raw sample tap
pub const DEFAULT_TAP_BUFFER_SIZE: usize = 4096;

/// Completion callback: MP3 bytes plus metadata
pub type CompletionCallback = Arc<dyn Fn(Vec<u8>, RecordingMetadata) + Send + Sync>;

/// Active configuration of a controller.
///
/// `sample_rate`, `bitrate_kbps`, `timeslice` and `tap_buffer_size` are
/// captured when a recording starts; changing them later affects the next
/// recording only. The callback and both limits are read live.
#[derive(Clone)]
pub struct RecorderOptions {
    pub on_recording_complete: CompletionCallback,
    pub max_duration: Duration,
    pub max_size_bytes: u64,
    pub bitrate_kbps: u32,
    pub sample_rate: u32,
    pub elapsed_poll: StdDuration,
    pub timeslice: StdDuration,
    pub tap_buffer_size: usize,
}

impl RecorderOptions {
    /// Options with every default and the given completion callback
    pub fn new<F>(on_recording_complete: F) -> Self
    where
        F: Fn(Vec<u8>, RecordingMetadata) + Send + Sync + 'static,
    {
        Self {
            on_recording_complete: Arc::new(on_recording_complete),
            max_duration: Duration::default_max_duration(),
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            bitrate_kbps: DEFAULT_BITRATE_KBPS,
            sample_rate: DEFAULT_SAMPLE_RATE,
            elapsed_poll: DEFAULT_ELAPSED_POLL,
            timeslice: DEFAULT_TIMESLICE,
            tap_buffer_size: DEFAULT_TAP_BUFFER_SIZE,
        }
    }

    pub fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = max_duration;
        self
    }

    pub fn with_max_size_bytes(mut self, max_size_bytes: u64) -> Self {
        self.max_size_bytes = max_size_bytes;
        self
    }

    pub fn with_bitrate(mut self, bitrate_kbps: u32) -> Self {
        self.bitrate_kbps = bitrate_kbps;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_elapsed_poll(mut self, elapsed_poll: StdDuration) -> Self {
        self.elapsed_poll = elapsed_poll;
        self
    }

    pub fn with_timeslice(mut self, timeslice: StdDuration) -> Self {
        self.timeslice = timeslice;
        self
    }

    pub fn with_tap_buffer_size(mut self, tap_buffer_size: usize) -> Self {
        self.tap_buffer_size = tap_buffer_size;
        self
    }
}

impl fmt::Debug for RecorderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecorderOptions")
            .field("max_duration", &self.max_duration)
            .field("max_size_bytes", &self.max_size_bytes)
            .field("bitrate_kbps", &self.bitrate_kbps)
            .field("sample_rate", &self.sample_rate)
            .field("elapsed_poll", &self.elapsed_poll)
            .field("timeslice", &self.timeslice)
            .field("tap_buffer_size", &self.tap_buffer_size)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = RecorderOptions::new(|_, _| {});
        assert_eq!(options.max_duration.as_secs(), 600);
        assert_eq!(options.max_size_bytes, 25 * 1024 * 1024);
        assert_eq!(options.bitrate_kbps, 64);
        assert_eq!(options.sample_rate, 44_100);
        assert_eq!(options.elapsed_poll, StdDuration::from_millis(250));
        assert_eq!(options.timeslice, StdDuration::from_millis(1000));
        assert_eq!(options.tap_buffer_size, 4096);
    }

    #[test]
    fn builders_override() {
        let options = RecorderOptions::new(|_, _| {})
            .with_max_duration(Duration::from_secs(2))
            .with_max_size_bytes(100)
            .with_bitrate(128)
            .with_sample_rate(22_050);
        assert_eq!(options.max_duration.as_secs(), 2);
        assert_eq!(options.max_size_bytes, 100);
        assert_eq!(options.bitrate_kbps, 128);
        assert_eq!(options.sample_rate, 22_050);
    }

    #[test]
    fn debug_omits_callback() {
        let text = format!("{:?}", RecorderOptions::new(|_, _| {}));
        assert!(text.contains("max_size_bytes"));
        assert!(!text.contains("on_recording_complete"));
    }
}
