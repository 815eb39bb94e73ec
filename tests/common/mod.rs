//! In-memory hosts for driving the recorder without audio hardware

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use mp3_capture::application::capture::PcmFanOut;
use mp3_capture::application::ports::{
    BlobDecoder, CaptureError, ChunkCallback, ChunkedRecorderHost, CodecConfig, CodecError,
    CodecFactory, DecodeError, DecodedAudio, MicrophoneAccess, MicrophoneStream,
    NativeChunkedRecorder, NativeSampleTap, PcmCodec, SampleTapHost, StoppedCallback,
};
use mp3_capture::application::{Mp3EncodeSessionFactory, RecorderController, RecorderHost};
use mp3_capture::domain::recording::{Phase, RecorderOptions, RecorderState, RecordingMetadata};
use mp3_capture::infrastructure::FanOutTapHost;

/// Microphone whose PCM is pushed by the test
pub struct FakeMicrophone {
    available: bool,
    deny: bool,
    sample_rate: u32,
    acquisitions: AtomicUsize,
    releases: Arc<AtomicUsize>,
    current: Mutex<Option<PcmFanOut>>,
}

impl FakeMicrophone {
    pub fn new(sample_rate: u32) -> Arc<Self> {
        Arc::new(Self {
            available: true,
            deny: false,
            sample_rate,
            acquisitions: AtomicUsize::new(0),
            releases: Arc::new(AtomicUsize::new(0)),
            current: Mutex::new(None),
        })
    }

    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            available: false,
            ..Self::plain()
        })
    }

    pub fn denying() -> Arc<Self> {
        Arc::new(Self {
            deny: true,
            ..Self::plain()
        })
    }

    fn plain() -> Self {
        Self {
            available: true,
            deny: false,
            sample_rate: 44_100,
            acquisitions: AtomicUsize::new(0),
            releases: Arc::new(AtomicUsize::new(0)),
            current: Mutex::new(None),
        }
    }

    /// Deliver samples to every listener of the latest stream
    pub fn publish(&self, samples: &[f32]) {
        let fan_out = self.current.lock().unwrap().clone();
        if let Some(fan_out) = fan_out {
            fan_out.publish(samples);
        }
    }

    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MicrophoneAccess for FakeMicrophone {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn acquire(&self) -> Result<Box<dyn MicrophoneStream>, CaptureError> {
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        if self.deny {
            return Err(CaptureError::PermissionDenied);
        }
        let fan_out = PcmFanOut::new();
        *self.current.lock().unwrap() = Some(fan_out.clone());
        Ok(Box::new(FakeStream {
            sample_rate: self.sample_rate,
            fan_out,
            releases: Arc::clone(&self.releases),
        }))
    }
}

struct FakeStream {
    sample_rate: u32,
    fan_out: PcmFanOut,
    releases: Arc<AtomicUsize>,
}

impl MicrophoneStream for FakeStream {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn pcm(&self) -> &PcmFanOut {
        &self.fan_out
    }

    fn release(self: Box<Self>) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Chunked recorder that emits a fixed list of chunks when stopped
#[derive(Default)]
pub struct ScriptedChunkedHost {
    unsupported: bool,
    chunks: Vec<Vec<u8>>,
    stops: Arc<AtomicUsize>,
    aborts: Arc<AtomicUsize>,
}

impl ScriptedChunkedHost {
    pub fn with_chunks(chunks: Vec<Vec<u8>>) -> Arc<Self> {
        Arc::new(Self {
            chunks,
            ..Default::default()
        })
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn unsupported() -> Arc<Self> {
        Arc::new(Self {
            unsupported: true,
            ..Default::default()
        })
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn aborts(&self) -> usize {
        self.aborts.load(Ordering::SeqCst)
    }
}

impl ChunkedRecorderHost for ScriptedChunkedHost {
    fn is_supported(&self) -> bool {
        !self.unsupported
    }

    fn create(
        &self,
        _stream: &dyn MicrophoneStream,
    ) -> Result<Box<dyn NativeChunkedRecorder>, CaptureError> {
        Ok(Box::new(ScriptedRecorder {
            chunks: self.chunks.clone(),
            stops: Arc::clone(&self.stops),
            aborts: Arc::clone(&self.aborts),
            callbacks: None,
        }))
    }
}

struct ScriptedRecorder {
    chunks: Vec<Vec<u8>>,
    stops: Arc<AtomicUsize>,
    aborts: Arc<AtomicUsize>,
    callbacks: Option<(ChunkCallback, StoppedCallback)>,
}

impl NativeChunkedRecorder for ScriptedRecorder {
    fn start(
        &mut self,
        _timeslice: Duration,
        on_chunk: ChunkCallback,
        on_stopped: StoppedCallback,
    ) -> Result<(), CaptureError> {
        self.callbacks = Some((on_chunk, on_stopped));
        Ok(())
    }

    fn stop(&mut self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if let Some((on_chunk, on_stopped)) = self.callbacks.take() {
            let chunks = std::mem::take(&mut self.chunks);
            // the host confirms asynchronously
            tokio::spawn(async move {
                for chunk in chunks {
                    on_chunk(chunk);
                }
                on_stopped();
            });
        }
    }

    fn abort(&mut self) {
        self.aborts.fetch_add(1, Ordering::SeqCst);
        self.callbacks = None;
    }
}

/// Sample tap host that reports no support
pub struct UnsupportedTapHost;

impl SampleTapHost for UnsupportedTapHost {
    fn is_supported(&self) -> bool {
        false
    }

    fn create(
        &self,
        _stream: &dyn MicrophoneStream,
    ) -> Result<Box<dyn NativeSampleTap>, CaptureError> {
        Err(CaptureError::Unsupported("Raw sample tap".to_string()))
    }
}

/// Decoder returning a fixed number of samples at the requested rate
pub struct FakeDecoder {
    samples: usize,
    fail: bool,
    calls: AtomicUsize,
    entered: Notify,
    gate: Option<Notify>,
}

impl FakeDecoder {
    pub fn returning(samples: usize) -> Arc<Self> {
        Arc::new(Self::plain(samples, false, false))
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self::plain(0, true, false))
    }

    /// Decoder that blocks until [`open`](Self::open) is called
    pub fn gated(samples: usize) -> Arc<Self> {
        Arc::new(Self::plain(samples, false, true))
    }

    fn plain(samples: usize, fail: bool, gated: bool) -> Self {
        Self {
            samples,
            fail,
            calls: AtomicUsize::new(0),
            entered: Notify::new(),
            gate: gated.then(Notify::new),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Wait until a decode call is in progress
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn open(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }
}

#[async_trait]
impl BlobDecoder for FakeDecoder {
    async fn decode(&self, _bytes: Vec<u8>, target_rate: u32) -> Result<DecodedAudio, DecodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail {
            return Err(DecodeError::Malformed("not audio".to_string()));
        }
        Ok(DecodedAudio {
            mono_pcm: vec![0.25; self.samples],
            sample_rate: target_rate,
            duration_secs: self.samples as f64 / f64::from(target_rate),
        })
    }
}

/// Codec writing `bytes_per_frame` bytes for every frame it encodes
pub struct FixedSizeCodecs {
    bytes_per_frame: usize,
    reject_creates: AtomicUsize,
    faulty_creates: AtomicUsize,
    created: AtomicUsize,
}

impl FixedSizeCodecs {
    pub fn new(bytes_per_frame: usize) -> Arc<Self> {
        Self::build(bytes_per_frame, 0, 0)
    }

    /// The first `n` creates are rejected
    pub fn rejecting(bytes_per_frame: usize, n: usize) -> Arc<Self> {
        Self::build(bytes_per_frame, n, 0)
    }

    /// The first `n` codecs fail on every frame
    pub fn faulty(bytes_per_frame: usize, n: usize) -> Arc<Self> {
        Self::build(bytes_per_frame, 0, n)
    }

    fn build(bytes_per_frame: usize, reject: usize, faulty: usize) -> Arc<Self> {
        Arc::new(Self {
            bytes_per_frame,
            reject_creates: AtomicUsize::new(reject),
            faulty_creates: AtomicUsize::new(faulty),
            created: AtomicUsize::new(0),
        })
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    fn take_one(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl CodecFactory for FixedSizeCodecs {
    fn create(&self, config: CodecConfig) -> Result<Box<dyn PcmCodec>, CodecError> {
        if Self::take_one(&self.reject_creates) {
            return Err(CodecError::Config(format!(
                "{} Hz rejected",
                config.sample_rate
            )));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FixedSizeCodec {
            bytes_per_frame: self.bytes_per_frame,
            faulty: Self::take_one(&self.faulty_creates),
            frames: 0,
        }))
    }
}

struct FixedSizeCodec {
    bytes_per_frame: usize,
    faulty: bool,
    frames: u8,
}

impl PcmCodec for FixedSizeCodec {
    fn encode_frame(&mut self, _samples: &[i16]) -> Result<Vec<u8>, CodecError> {
        if self.faulty {
            return Err(CodecError::Encode("codec fault".to_string()));
        }
        self.frames = self.frames.wrapping_add(1);
        Ok(vec![self.frames; self.bytes_per_frame])
    }

    fn flush(&mut self) -> Result<Vec<u8>, CodecError> {
        Ok(Vec::new())
    }
}

/// Every completion delivered to the callback
#[derive(Clone, Default)]
pub struct Completions {
    calls: Arc<Mutex<Vec<(Vec<u8>, RecordingMetadata)>>>,
}

impl Completions {
    pub fn options(&self) -> RecorderOptions {
        let calls = Arc::clone(&self.calls);
        RecorderOptions::new(move |bytes, metadata| {
            calls.lock().unwrap().push((bytes, metadata));
        })
    }

    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<(Vec<u8>, RecordingMetadata)> {
        self.calls.lock().unwrap().last().cloned()
    }
}

/// Snapshots seen by a subscriber
#[derive(Clone, Default)]
pub struct Snapshots {
    seen: Arc<Mutex<Vec<RecorderState>>>,
}

impl Snapshots {
    pub fn attach(controller: &RecorderController) -> Self {
        let snapshots = Self::default();
        let seen = Arc::clone(&snapshots.seen);
        // the handle is dropped on purpose; dropping does not unsubscribe
        let _subscription = controller.subscribe(move |state| {
            seen.lock().unwrap().push(state.clone());
        });
        snapshots
    }

    pub fn count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn all(&self) -> Vec<RecorderState> {
        self.seen.lock().unwrap().clone()
    }
}

/// Builder for a host made of fakes
pub struct TestHost {
    pub microphone: Arc<FakeMicrophone>,
    pub chunked: Arc<ScriptedChunkedHost>,
    pub tap_supported: bool,
    pub decoder: Arc<FakeDecoder>,
    pub codecs: Arc<FixedSizeCodecs>,
    pub prefer_worker: bool,
}

impl TestHost {
    /// Live path only, 44.1 kHz microphone
    pub fn live_only() -> Self {
        Self {
            microphone: FakeMicrophone::new(44_100),
            chunked: ScriptedChunkedHost::unsupported(),
            tap_supported: true,
            decoder: FakeDecoder::returning(44_100),
            codecs: FixedSizeCodecs::new(4),
            prefer_worker: false,
        }
    }

    /// Chunked path only, with the given chunks on stop
    pub fn chunks_only(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunked: ScriptedChunkedHost::with_chunks(chunks),
            tap_supported: false,
            ..Self::live_only()
        }
    }

    pub fn host(&self) -> RecorderHost {
        let sample_tap: Arc<dyn SampleTapHost> = if self.tap_supported {
            Arc::new(FanOutTapHost::new())
        } else {
            Arc::new(UnsupportedTapHost)
        };
        RecorderHost {
            microphone: self.microphone.clone(),
            chunked_recorder: self.chunked.clone(),
            sample_tap,
            decoder: self.decoder.clone(),
            encoders: Arc::new(Mp3EncodeSessionFactory::new(
                self.codecs.clone(),
                self.prefer_worker,
            )),
        }
    }
}

/// Wait until the controller is idle again, failing after five seconds
pub async fn settle(controller: &RecorderController) -> RecorderState {
    let mut states = controller.watch();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if controller.phase() == Phase::Idle {
                return controller.get_state();
            }
            if states.changed().await.is_err() {
                return controller.get_state();
            }
        }
    })
    .await
    .expect("controller did not settle")
}

/// Poll `condition` until it holds, failing after five seconds
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never held");
}
