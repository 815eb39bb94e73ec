//! Per-recording session state

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

use super::capture::{BlobDriver, FanOutSubscription, LiveSink, TapDriver};
use super::ports::MicrophoneStream;
use crate::domain::recording::ChunkBuffer;

/// Settings frozen when the recording started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionParams {
    pub capture_rate: u32,
    pub target_rate: u32,
    pub bitrate_kbps: u32,
}

/// Everything one recording attempt owns.
///
/// Created by `start`, moved out of the controller when finalization
/// begins, and consumed by either [`Session::release`] or
/// [`Session::abort`]. The microphone stream is released exactly once, by
/// whichever of the two runs.
pub struct Session {
    id: u64,
    params: SessionParams,
    stream: Option<Box<dyn MicrophoneStream>>,
    blob: Option<Arc<BlobDriver>>,
    tap: Option<TapDriver>,
    live: Option<Arc<LiveSink>>,
    meter: Option<FanOutSubscription>,
    ticker: Option<JoinHandle<()>>,
}

impl Session {
    pub fn new(id: u64, params: SessionParams, stream: Box<dyn MicrophoneStream>) -> Self {
        Self {
            id,
            params,
            stream: Some(stream),
            blob: None,
            tap: None,
            live: None,
            meter: None,
            ticker: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn params(&self) -> SessionParams {
        self.params
    }

    pub fn stream(&self) -> Option<&dyn MicrophoneStream> {
        self.stream.as_deref()
    }

    pub fn attach_blob(&mut self, blob: BlobDriver) {
        self.blob = Some(Arc::new(blob));
    }

    pub fn attach_tap(&mut self, tap: TapDriver) {
        self.live = Some(Arc::clone(tap.sink()));
        self.tap = Some(tap);
    }

    pub fn attach_meter(&mut self, meter: FanOutSubscription) {
        self.meter = Some(meter);
    }

    pub fn attach_ticker(&mut self, ticker: JoinHandle<()>) {
        self.ticker = Some(ticker);
    }

    pub fn has_blob(&self) -> bool {
        self.blob.is_some()
    }

    pub fn has_live(&self) -> bool {
        self.live.is_some()
    }

    pub fn live(&self) -> Option<&Arc<LiveSink>> {
        self.live.as_ref()
    }

    /// Chunks captured by the blob driver, empty without one
    pub fn chunks(&self) -> ChunkBuffer {
        self.blob
            .as_ref()
            .map(|blob| blob.chunks())
            .unwrap_or_default()
    }

    /// End capture: stop the poll, the level meter and the sample tap.
    ///
    /// Returns the blob driver, which the caller stops once no lock is
    /// held, since its completion may run synchronously.
    pub fn stop_capture(&mut self) -> Option<Arc<BlobDriver>> {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        if let Some(mut meter) = self.meter.take() {
            meter.cancel();
        }
        if let Some(tap) = self.tap.take() {
            tap.stop();
        }
        self.blob.clone()
    }

    /// Normal end of a session after finalization
    pub fn release(mut self) {
        if let Some(blob) = self.blob.take() {
            blob.clear();
        }
        debug!(session = self.id, "session released");
    }

    /// Teardown without finalization; the blob driver's completion is
    /// suppressed.
    pub fn abort(mut self) {
        if let Some(blob) = self.blob.take() {
            blob.abort();
            blob.clear();
        }
        debug!(session = self.id, "session aborted");
    }

    fn close_live(&mut self) {
        if let Some(live) = self.live.take() {
            if let Some((encoder, _)) = live.seal() {
                encoder.close();
            }
        }
    }

    fn release_stream(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.release();
        }
    }
}

/// Whatever path ends the session, capture stops, the live encoder is
/// closed and the stream is released here.
impl Drop for Session {
    fn drop(&mut self) {
        self.stop_capture();
        if let Some(blob) = self.blob.take() {
            blob.abort();
        }
        self.close_live();
        self.release_stream();
    }
}
