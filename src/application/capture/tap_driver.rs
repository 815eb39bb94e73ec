//! Raw-sample-tap capture driver

use std::sync::Arc;

use tracing::debug;

use crate::application::ports::{CaptureError, MicrophoneStream, NativeSampleTap, SampleTapHost};

use super::live_sink::LiveSink;

/// Feeds fixed-size PCM buffers from the host tap into a [`LiveSink`].
pub struct TapDriver {
    tap: Box<dyn NativeSampleTap>,
    sink: Arc<LiveSink>,
}

impl TapDriver {
    pub fn start(
        host: &dyn SampleTapHost,
        stream: &dyn MicrophoneStream,
        buffer_size: usize,
        sink: Arc<LiveSink>,
    ) -> Result<Self, CaptureError> {
        if !host.is_supported() {
            return Err(CaptureError::Unsupported("Raw sample tap".to_string()));
        }

        let mut tap = host.create(stream)?;
        let target = Arc::clone(&sink);
        tap.connect(
            buffer_size,
            Arc::new(move |buffer: &[f32]| {
                target.push(buffer);
            }),
        )?;
        debug!(buffer_size, "sample tap connected");

        Ok(Self { tap, sink })
    }

    pub fn sink(&self) -> &Arc<LiveSink> {
        &self.sink
    }

    /// Disconnect from the audio graph
    pub fn stop(mut self) {
        self.tap.disconnect();
    }
}
