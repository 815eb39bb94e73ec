//! Microphone access port interfaces

use async_trait::async_trait;
use thiserror::Error;

use crate::application::capture::PcmFanOut;
use crate::domain::error::RecorderError;

/// Capture-side failures reported by host adapters
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("Microphone permission denied")]
    PermissionDenied,

    #[error("{0} is not supported")]
    Unsupported(String),

    #[error("Capture failed: {0}")]
    Failed(String),
}

impl From<CaptureError> for RecorderError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::PermissionDenied => RecorderError::PermissionDenied,
            CaptureError::Unsupported(_) => RecorderError::recording_unsupported(),
            CaptureError::Failed(msg) => RecorderError::CapabilityUnavailable(format!(
                "Could not access the microphone: {}",
                msg
            )),
        }
    }
}

/// A live microphone stream.
///
/// Both capture drivers read from the same fan-out; neither releases the
/// stream. The owner releases it exactly once by consuming the handle.
pub trait MicrophoneStream: Send + Sync {
    /// Capture sample rate, fixed for the lifetime of the stream
    fn sample_rate(&self) -> u32;

    /// Mono f32 buffers as they arrive from the device
    fn pcm(&self) -> &PcmFanOut;

    /// Stop the underlying tracks
    fn release(self: Box<Self>);
}

/// Port for acquiring an exclusive microphone stream
#[async_trait]
pub trait MicrophoneAccess: Send + Sync {
    /// Whether the host has any microphone capability at all
    fn is_available(&self) -> bool;

    /// Acquire the microphone.
    ///
    /// Fails with `CaptureError::PermissionDenied` when the user or OS
    /// refused access, and with other variants for every other problem.
    async fn acquire(&self) -> Result<Box<dyn MicrophoneStream>, CaptureError>;
}
