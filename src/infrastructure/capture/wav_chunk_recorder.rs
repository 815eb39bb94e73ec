//! Chunked recorder that emits a streaming WAV
//!
//! The first non-empty chunk starts with a WAV header whose size fields are
//! zero; later chunks are raw 16-bit PCM. Concatenated, the chunks form a
//! file whose sizes the decoder repairs.

use std::io::Cursor;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::time::{interval_at, Instant};
use tracing::debug;

use crate::application::capture::{FanOutSubscription, PcmFanOut};
use crate::application::encoding::pcm::to_i16;
use crate::application::ports::{
    CaptureError, ChunkCallback, ChunkedRecorderHost, MicrophoneStream, NativeChunkedRecorder,
    StoppedCallback,
};

/// Header for a mono 16-bit PCM WAV with an empty data chunk
pub fn wav_header(sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    hound::WavWriter::new(&mut cursor, spec)?.finalize()?;
    Ok(cursor.into_inner())
}

/// Creates [`WavChunkRecorder`]s reading from the stream's fan-out
#[derive(Debug, Default)]
pub struct WavChunkRecorderHost;

impl WavChunkRecorderHost {
    pub fn new() -> Self {
        Self
    }
}

impl ChunkedRecorderHost for WavChunkRecorderHost {
    fn is_supported(&self) -> bool {
        true
    }

    fn create(
        &self,
        stream: &dyn MicrophoneStream,
    ) -> Result<Box<dyn NativeChunkedRecorder>, CaptureError> {
        Ok(Box::new(WavChunkRecorder {
            fan_out: stream.pcm().clone(),
            sample_rate: stream.sample_rate(),
            subscription: None,
            control: None,
        }))
    }
}

enum Control {
    Stop,
    Abort,
}

/// Buffered PCM plus whether the header went out yet
struct Pending {
    samples: Vec<i16>,
    header: Option<Vec<u8>>,
}

impl Pending {
    /// Take everything buffered as one chunk; `None` while nothing arrived
    fn take_chunk(&mut self) -> Option<Vec<u8>> {
        if self.samples.is_empty() {
            return None;
        }
        let mut chunk = self.header.take().unwrap_or_default();
        chunk.reserve(self.samples.len() * 2);
        for sample in self.samples.drain(..) {
            chunk.extend_from_slice(&sample.to_le_bytes());
        }
        Some(chunk)
    }
}

fn lock(pending: &Mutex<Pending>) -> MutexGuard<'_, Pending> {
    pending.lock().unwrap_or_else(|p| p.into_inner())
}

pub struct WavChunkRecorder {
    fan_out: PcmFanOut,
    sample_rate: u32,
    subscription: Option<FanOutSubscription>,
    control: Option<oneshot::Sender<Control>>,
}

impl WavChunkRecorder {
    fn signal(&mut self, control: Control) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }
        if let Some(sender) = self.control.take() {
            let _ = sender.send(control);
        }
    }
}

impl NativeChunkedRecorder for WavChunkRecorder {
    fn start(
        &mut self,
        timeslice: Duration,
        on_chunk: ChunkCallback,
        on_stopped: StoppedCallback,
    ) -> Result<(), CaptureError> {
        if self.control.is_some() {
            return Err(CaptureError::Failed("Recorder already started".to_string()));
        }
        let runtime = Handle::try_current()
            .map_err(|e| CaptureError::Failed(format!("No async runtime: {}", e)))?;
        let header = wav_header(self.sample_rate)
            .map_err(|e| CaptureError::Failed(format!("Failed to build WAV header: {}", e)))?;

        let pending = Arc::new(Mutex::new(Pending {
            samples: Vec::new(),
            header: Some(header),
        }));
        let sink = Arc::clone(&pending);
        self.subscription = Some(self.fan_out.subscribe(Arc::new(move |samples: &[f32]| {
            lock(&sink).samples.extend(to_i16(samples));
        })));

        let (control_tx, mut control_rx) = oneshot::channel();
        self.control = Some(control_tx);

        let period = timeslice.max(Duration::from_millis(10));
        runtime.spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            let control = loop {
                tokio::select! {
                    _ = ticks.tick() => {
                        let chunk = lock(&pending).take_chunk();
                        if let Some(chunk) = chunk {
                            on_chunk(chunk);
                        }
                    }
                    control = &mut control_rx => break control.unwrap_or(Control::Abort),
                }
            };

            if let Control::Stop = control {
                let chunk = lock(&pending).take_chunk();
                if let Some(chunk) = chunk {
                    on_chunk(chunk);
                }
                debug!("chunked recorder stopped");
                on_stopped();
            }
        });

        debug!(sample_rate = self.sample_rate, "chunked recorder started");
        Ok(())
    }

    fn stop(&mut self) {
        self.signal(Control::Stop);
    }

    fn abort(&mut self) {
        self.signal(Control::Abort);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stream(PcmFanOut);

    impl MicrophoneStream for Stream {
        fn sample_rate(&self) -> u32 {
            16_000
        }
        fn pcm(&self) -> &PcmFanOut {
            &self.0
        }
        fn release(self: Box<Self>) {}
    }

    fn recorder(fan_out: &PcmFanOut) -> Box<dyn NativeChunkedRecorder> {
        WavChunkRecorderHost::new()
            .create(&Stream(fan_out.clone()))
            .unwrap()
    }

    #[test]
    fn header_is_riff_wave() {
        let header = wav_header(44_100).unwrap();
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[8..12], b"WAVE");
    }

    #[tokio::test]
    async fn stop_flushes_final_chunk_then_confirms() {
        let fan_out = PcmFanOut::new();
        let mut recorder = recorder(&fan_out);
        let chunks = Arc::new(Mutex::new(Vec::<Vec<u8>>::new()));
        let (stopped_tx, stopped_rx) = oneshot::channel();

        let collected = Arc::clone(&chunks);
        recorder
            .start(
                Duration::from_secs(60),
                Arc::new(move |chunk| collected.lock().unwrap().push(chunk)),
                Box::new(move || {
                    let _ = stopped_tx.send(());
                }),
            )
            .unwrap();

        fan_out.publish(&[0.5; 100]);
        recorder.stop();
        stopped_rx.await.unwrap();

        let chunks = chunks.lock().unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(&chunks[0][0..4], b"RIFF");
        assert_eq!(chunks[0].len(), wav_header(16_000).unwrap().len() + 200);
        assert_eq!(fan_out.listener_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn emits_on_every_timeslice() {
        let fan_out = PcmFanOut::new();
        let mut recorder = recorder(&fan_out);
        let chunks = Arc::new(Mutex::new(Vec::<Vec<u8>>::new()));

        let collected = Arc::clone(&chunks);
        recorder
            .start(
                Duration::from_millis(1000),
                Arc::new(move |chunk| collected.lock().unwrap().push(chunk)),
                Box::new(|| {}),
            )
            .unwrap();

        fan_out.publish(&[0.0; 10]);
        tokio::time::sleep(Duration::from_millis(1100)).await;
        fan_out.publish(&[0.0; 10]);
        tokio::time::sleep(Duration::from_millis(1000)).await;

        let chunks = chunks.lock().unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].len(), 20);
        recorder.abort();
    }

    #[tokio::test]
    async fn abort_never_confirms() {
        let fan_out = PcmFanOut::new();
        let mut recorder = recorder(&fan_out);
        let (stopped_tx, stopped_rx) = oneshot::channel::<()>();

        recorder
            .start(
                Duration::from_secs(60),
                Arc::new(|_| {}),
                Box::new(move || {
                    let _ = stopped_tx.send(());
                }),
            )
            .unwrap();
        recorder.abort();

        // the sender is dropped with the task, without being used
        assert!(stopped_rx.await.is_err());
    }
}
