//! Native chunked recorder port interfaces

use std::sync::Arc;
use std::time::Duration;

use super::microphone::{CaptureError, MicrophoneStream};

/// Called with each opaque chunk, in arrival order
pub type ChunkCallback = Arc<dyn Fn(Vec<u8>) + Send + Sync>;

/// Called once the native recorder confirms capture has fully ended
pub type StoppedCallback = Box<dyn FnOnce() + Send>;

/// A host facility that records the stream into opaque encoded chunks.
pub trait NativeChunkedRecorder: Send {
    /// Begin recording, emitting a chunk roughly every `timeslice`.
    fn start(
        &mut self,
        timeslice: Duration,
        on_chunk: ChunkCallback,
        on_stopped: StoppedCallback,
    ) -> Result<(), CaptureError>;

    /// Graceful stop: emit any pending data, then confirm via `on_stopped`.
    fn stop(&mut self);

    /// Teardown: drop pending data and never call `on_stopped`.
    fn abort(&mut self);
}

/// Port for creating native chunked recorders
pub trait ChunkedRecorderHost: Send + Sync {
    fn is_supported(&self) -> bool;

    fn create(
        &self,
        stream: &dyn MicrophoneStream,
    ) -> Result<Box<dyn NativeChunkedRecorder>, CaptureError>;
}
