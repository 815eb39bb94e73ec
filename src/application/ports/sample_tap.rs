//! Native raw-sample tap port interfaces

use std::sync::Arc;

use super::microphone::{CaptureError, MicrophoneStream};

/// Receives fixed-size mono buffers synchronously, on the audio thread
pub type BufferCallback = Arc<dyn Fn(&[f32]) + Send + Sync>;

/// A tap on the live audio graph
pub trait NativeSampleTap: Send + Sync {
    fn connect(&mut self, buffer_size: usize, on_buffer: BufferCallback)
        -> Result<(), CaptureError>;

    /// Stop delivering buffers. Safe to call more than once.
    fn disconnect(&mut self);
}

/// Port for creating raw-sample taps
pub trait SampleTapHost: Send + Sync {
    fn is_supported(&self) -> bool;

    fn create(&self, stream: &dyn MicrophoneStream)
        -> Result<Box<dyn NativeSampleTap>, CaptureError>;
}
