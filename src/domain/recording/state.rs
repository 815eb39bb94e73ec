//! Public state snapshot

use serde::Serialize;

use super::levels::LEVEL_BINS;

/// Immutable snapshot of the recorder, handed to subscribers on every change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderState {
    /// Microphone capture is active
    pub is_recording: bool,
    /// Finalization (flush, decode, encode) is running
    pub is_processing: bool,
    /// Whole seconds since start, updated by the elapsed poll
    pub elapsed_seconds: u64,
    /// Last user-facing failure; kept until cleared or the next successful start
    pub error: Option<String>,
    /// Visualization bins (0..=255), empty when not recording
    pub audio_levels: Vec<u8>,
}

impl RecorderState {
    /// Snapshot for a freshly started recording
    pub fn recording() -> Self {
        Self {
            is_recording: true,
            is_processing: false,
            elapsed_seconds: 0,
            error: None,
            audio_levels: vec![0; LEVEL_BINS],
        }
    }

    /// Move to the finalizing view: capture off, processing on, bins cleared
    pub fn enter_processing(&mut self) {
        self.is_recording = false;
        self.is_processing = true;
        self.audio_levels.clear();
    }

    /// Back to idle, keeping `error` and `elapsed_seconds`
    pub fn enter_idle(&mut self) {
        self.is_recording = false;
        self.is_processing = false;
        self.audio_levels.clear();
    }

    pub fn is_idle(&self) -> bool {
        !self.is_recording && !self.is_processing
    }
}
