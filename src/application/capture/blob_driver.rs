//! Chunked-blob capture driver

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::debug;

use crate::application::ports::{
    CaptureError, ChunkedRecorderHost, MicrophoneStream, NativeChunkedRecorder,
};
use crate::domain::recording::ChunkBuffer;

/// Signal fired at most once when the native recorder confirms it stopped
struct Completion {
    hook: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Completion {
    fn fire(&self) {
        let hook = self
            .hook
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        if let Some(hook) = hook {
            hook();
        }
    }

    fn suppress(&self) {
        self.hook.lock().unwrap_or_else(|p| p.into_inner()).take();
    }
}

/// Drives the host's chunked recorder and accumulates its chunks.
///
/// `stop` is graceful: the completion hook runs once the host confirms the
/// capture has ended. `abort` is teardown: the hook never runs.
pub struct BlobDriver {
    recorder: Mutex<Box<dyn NativeChunkedRecorder>>,
    chunks: Arc<Mutex<ChunkBuffer>>,
    completion: Arc<Completion>,
}

impl BlobDriver {
    pub fn start(
        host: &dyn ChunkedRecorderHost,
        stream: &dyn MicrophoneStream,
        timeslice: Duration,
        on_complete: Box<dyn FnOnce() + Send>,
    ) -> Result<Self, CaptureError> {
        if !host.is_supported() {
            return Err(CaptureError::Unsupported("Chunked recording".to_string()));
        }

        let mut recorder = host.create(stream)?;
        let chunks = Arc::new(Mutex::new(ChunkBuffer::new()));
        let completion = Arc::new(Completion {
            hook: Mutex::new(Some(on_complete)),
        });

        let sink = Arc::clone(&chunks);
        let on_chunk = Arc::new(move |chunk: Vec<u8>| {
            sink.lock().unwrap_or_else(|p| p.into_inner()).push(chunk);
        });
        let signal = Arc::clone(&completion);
        let on_stopped = Box::new(move || signal.fire());

        recorder.start(timeslice, on_chunk, on_stopped)?;
        debug!(timeslice_ms = timeslice.as_millis() as u64, "blob driver started");

        Ok(Self {
            recorder: Mutex::new(recorder),
            chunks,
            completion,
        })
    }

    /// Ask the host to stop; completion follows asynchronously.
    pub fn stop(&self) {
        self.recorder
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .stop();
    }

    /// Force-stop without triggering completion.
    pub fn abort(&self) {
        self.completion.suppress();
        self.recorder
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .abort();
    }

    /// Copy of the chunks received so far
    pub fn chunks(&self) -> ChunkBuffer {
        self.chunks.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn clear(&self) {
        self.chunks.lock().unwrap_or_else(|p| p.into_inner()).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::capture::PcmFanOut;
    use crate::application::ports::{ChunkCallback, StoppedCallback};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Stream(PcmFanOut);

    impl MicrophoneStream for Stream {
        fn sample_rate(&self) -> u32 {
            48_000
        }
        fn pcm(&self) -> &PcmFanOut {
            &self.0
        }
        fn release(self: Box<Self>) {}
    }

    /// Records callbacks so the test can play the host's part
    #[derive(Default)]
    struct Wiring {
        on_chunk: Mutex<Option<ChunkCallback>>,
        on_stopped: Mutex<Option<StoppedCallback>>,
    }

    struct ManualRecorder(Arc<Wiring>);

    impl NativeChunkedRecorder for ManualRecorder {
        fn start(
            &mut self,
            _timeslice: Duration,
            on_chunk: ChunkCallback,
            on_stopped: StoppedCallback,
        ) -> Result<(), CaptureError> {
            *self.0.on_chunk.lock().unwrap() = Some(on_chunk);
            *self.0.on_stopped.lock().unwrap() = Some(on_stopped);
            Ok(())
        }
        fn stop(&mut self) {}
        fn abort(&mut self) {}
    }

    struct ManualHost {
        wiring: Arc<Wiring>,
        supported: bool,
    }

    impl ChunkedRecorderHost for ManualHost {
        fn is_supported(&self) -> bool {
            self.supported
        }
        fn create(
            &self,
            _stream: &dyn MicrophoneStream,
        ) -> Result<Box<dyn NativeChunkedRecorder>, CaptureError> {
            Ok(Box::new(ManualRecorder(Arc::clone(&self.wiring))))
        }
    }

    fn counter_hook(count: &Arc<AtomicUsize>) -> Box<dyn FnOnce() + Send> {
        let count = Arc::clone(count);
        Box::new(move || {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn accumulates_chunks_and_completes_once() {
        let wiring = Arc::new(Wiring::default());
        let host = ManualHost {
            wiring: Arc::clone(&wiring),
            supported: true,
        };
        let fired = Arc::new(AtomicUsize::new(0));
        let driver = BlobDriver::start(
            &host,
            &Stream(PcmFanOut::new()),
            Duration::from_millis(1000),
            counter_hook(&fired),
        )
        .unwrap();

        let on_chunk = wiring.on_chunk.lock().unwrap().clone().unwrap();
        on_chunk(vec![1, 2]);
        on_chunk(vec![3]);
        assert_eq!(driver.chunks().assemble(), vec![1, 2, 3]);

        driver.stop();
        let on_stopped = wiring.on_stopped.lock().unwrap().take().unwrap();
        on_stopped();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn abort_suppresses_completion() {
        let wiring = Arc::new(Wiring::default());
        let host = ManualHost {
            wiring: Arc::clone(&wiring),
            supported: true,
        };
        let fired = Arc::new(AtomicUsize::new(0));
        let driver = BlobDriver::start(
            &host,
            &Stream(PcmFanOut::new()),
            Duration::from_millis(1000),
            counter_hook(&fired),
        )
        .unwrap();

        driver.abort();
        let on_stopped = wiring.on_stopped.lock().unwrap().take().unwrap();
        on_stopped();
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unsupported_host_is_rejected() {
        let host = ManualHost {
            wiring: Arc::new(Wiring::default()),
            supported: false,
        };
        let result = BlobDriver::start(
            &host,
            &Stream(PcmFanOut::new()),
            Duration::from_millis(1000),
            Box::new(|| {}),
        );
        assert!(matches!(result, Err(CaptureError::Unsupported(_))));
    }
}
