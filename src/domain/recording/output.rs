//! Finished recording value objects

use std::fmt;

use serde::Serialize;

/// MIME type of the recorder output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum AudioMimeType {
    /// Final output of every successful recording
    #[default]
    #[serde(rename = "audio/mpeg")]
    Mpeg,
}

impl AudioMimeType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mpeg => "audio/mpeg",
        }
    }
}

impl fmt::Display for AudioMimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metadata delivered alongside the MP3 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingMetadata {
    pub duration_sec: u64,
    pub size_bytes: u64,
    pub mime_type: AudioMimeType,
}

/// Encoded MP3 plus its metadata. `size_bytes` always equals `bytes.len()`.
#[derive(Debug, Clone)]
pub struct Mp3Recording {
    bytes: Vec<u8>,
    metadata: RecordingMetadata,
}

impl Mp3Recording {
    pub fn new(bytes: Vec<u8>, duration_sec: u64) -> Self {
        let metadata = RecordingMetadata {
            duration_sec,
            size_bytes: bytes.len() as u64,
            mime_type: AudioMimeType::Mpeg,
        };
        Self { bytes, metadata }
    }

    pub fn metadata(&self) -> RecordingMetadata {
        self.metadata
    }

    pub fn size_bytes(&self) -> u64 {
        self.metadata.size_bytes
    }

    pub fn into_parts(self) -> (Vec<u8>, RecordingMetadata) {
        (self.bytes, self.metadata)
    }

    pub fn human_readable_size(&self) -> String {
        human_readable_size(self.metadata.size_bytes)
    }
}

/// Round a frame count at `sample_rate` to whole seconds
pub fn rounded_seconds(frames: u64, sample_rate: u32) -> u64 {
    if sample_rate == 0 {
        return 0;
    }
    (frames as f64 / f64::from(sample_rate)).round() as u64
}

pub fn human_readable_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
