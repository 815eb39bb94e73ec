//! Encode session hosted on a dedicated encoder thread
//!
//! The session talks to the thread over two channels. Commands
//! (`Init`, `Append`, `Flush`, `Close`) are processed strictly in order, so
//! a flush observes every append sent before it. Events coming back are
//! routed by a small task into the reply slot that is waiting for them.

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use super::frame_encoder::FrameEncoder;
use crate::application::ports::{
    CodecFactory, EncodeError, EncodeParams, EncodeSession, EncoderKind,
};

/// How long the thread gets to report ready after `Init`
pub const DEFAULT_WORKER_INIT_TIMEOUT: Duration = Duration::from_millis(5000);

const WORKER_THREAD_NAME: &str = "mp3-encoder";

enum Command {
    Init(EncodeParams),
    Append(Vec<f32>),
    Flush,
    Close,
}

enum Event {
    Ready,
    Flushed(Vec<u8>),
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerPhase {
    Uninitialized,
    Initializing,
    Ready,
    Flushing,
    Closed,
}

type Reply<T> = oneshot::Sender<Result<T, EncodeError>>;

#[derive(Default)]
struct ReplySlots {
    ready: Option<Reply<()>>,
    flush: Option<Reply<Vec<u8>>>,
    fault: Option<String>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}

pub struct WorkerEncodeSession {
    params: EncodeParams,
    init_timeout: Duration,
    commands: mpsc::UnboundedSender<Command>,
    phase: Mutex<WorkerPhase>,
    slots: Arc<Mutex<ReplySlots>>,
}

impl WorkerEncodeSession {
    /// Start the encoder thread and its event router.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(
        codecs: Arc<dyn CodecFactory>,
        params: EncodeParams,
        init_timeout: Duration,
    ) -> Result<Self, EncodeError> {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run_worker(codecs, command_rx, event_tx))
            .map_err(|e| EncodeError::Worker(format!("Failed to spawn encoder thread: {}", e)))?;

        let slots = Arc::new(Mutex::new(ReplySlots::default()));
        tokio::spawn(route_events(event_rx, Arc::clone(&slots)));

        Ok(Self {
            params,
            init_timeout,
            commands: command_tx,
            phase: Mutex::new(WorkerPhase::Uninitialized),
            slots,
        })
    }

    fn not_running() -> EncodeError {
        EncodeError::Worker("encoder thread is not running".to_string())
    }
}

#[async_trait]
impl EncodeSession for WorkerEncodeSession {
    async fn initialize(&self) -> Result<(), EncodeError> {
        {
            let mut phase = lock(&self.phase);
            match *phase {
                WorkerPhase::Uninitialized => *phase = WorkerPhase::Initializing,
                WorkerPhase::Ready => return Ok(()),
                WorkerPhase::Initializing => {
                    return Err(EncodeError::Worker(
                        "initialization already in progress".to_string(),
                    ))
                }
                WorkerPhase::Flushing => return Err(EncodeError::FlushInProgress),
                WorkerPhase::Closed => return Err(EncodeError::Closed),
            }
        }

        let (reply, ready) = oneshot::channel();
        lock(&self.slots).ready = Some(reply);
        if self.commands.send(Command::Init(self.params)).is_err() {
            self.close();
            return Err(Self::not_running());
        }

        match timeout(self.init_timeout, ready).await {
            Ok(Ok(Ok(()))) => {
                let mut phase = lock(&self.phase);
                if *phase == WorkerPhase::Closed {
                    return Err(EncodeError::Closed);
                }
                *phase = WorkerPhase::Ready;
                debug!(
                    source_rate = self.params.source_rate,
                    target_rate = self.params.target_rate,
                    "encoder worker ready"
                );
                Ok(())
            }
            Ok(Ok(Err(e))) => {
                self.close();
                Err(e)
            }
            Ok(Err(_)) => {
                self.close();
                Err(Self::not_running())
            }
            Err(_) => {
                self.close();
                Err(EncodeError::InitTimeout(self.init_timeout))
            }
        }
    }

    fn append_pcm(&self, samples: &[f32]) {
        if *lock(&self.phase) != WorkerPhase::Ready {
            trace!("append ignored, encoder worker not ready");
            return;
        }
        if lock(&self.slots).fault.is_some() {
            return;
        }
        let _ = self.commands.send(Command::Append(samples.to_vec()));
    }

    async fn flush(&self) -> Result<Vec<u8>, EncodeError> {
        {
            let mut phase = lock(&self.phase);
            match *phase {
                WorkerPhase::Ready => *phase = WorkerPhase::Flushing,
                WorkerPhase::Flushing => return Err(EncodeError::FlushInProgress),
                WorkerPhase::Closed => return Err(EncodeError::Closed),
                WorkerPhase::Uninitialized | WorkerPhase::Initializing => {
                    return Err(EncodeError::NotInitialized)
                }
            }
        }

        let fault = lock(&self.slots).fault.clone();
        if let Some(message) = fault {
            self.close();
            return Err(EncodeError::Faulted(message));
        }

        let (reply, flushed) = oneshot::channel();
        lock(&self.slots).flush = Some(reply);
        if self.commands.send(Command::Flush).is_err() {
            self.close();
            return Err(Self::not_running());
        }

        let result = flushed.await.unwrap_or(Err(EncodeError::Closed));
        self.close();
        result
    }

    fn close(&self) {
        let previous = std::mem::replace(&mut *lock(&self.phase), WorkerPhase::Closed);
        if previous == WorkerPhase::Closed {
            return;
        }
        let _ = self.commands.send(Command::Close);

        let mut slots = lock(&self.slots);
        if let Some(reply) = slots.ready.take() {
            let _ = reply.send(Err(EncodeError::Closed));
        }
        if let Some(reply) = slots.flush.take() {
            let _ = reply.send(Err(EncodeError::Closed));
        }
        debug!("encoder worker closed");
    }

    fn kind(&self) -> EncoderKind {
        EncoderKind::Worker
    }
}

impl Drop for WorkerEncodeSession {
    fn drop(&mut self) {
        self.close();
    }
}

async fn route_events(mut events: mpsc::UnboundedReceiver<Event>, slots: Arc<Mutex<ReplySlots>>) {
    while let Some(event) = events.recv().await {
        let mut pending = lock(&slots);
        match event {
            Event::Ready => {
                if let Some(reply) = pending.ready.take() {
                    let _ = reply.send(Ok(()));
                }
            }
            Event::Flushed(bytes) => {
                if let Some(reply) = pending.flush.take() {
                    let _ = reply.send(Ok(bytes));
                }
            }
            Event::Error(message) => {
                warn!(error = %message, "encoder worker reported an error");
                pending.fault.get_or_insert_with(|| message.clone());
                if let Some(reply) = pending.ready.take() {
                    let _ = reply.send(Err(EncodeError::Worker(message)));
                } else if let Some(reply) = pending.flush.take() {
                    let _ = reply.send(Err(EncodeError::Worker(message)));
                }
            }
        }
    }

    let mut pending = lock(&slots);
    pending
        .fault
        .get_or_insert_with(|| "encoder thread exited".to_string());
    if let Some(reply) = pending.ready.take() {
        let _ = reply.send(Err(EncodeError::Worker("encoder thread exited".to_string())));
    }
    if let Some(reply) = pending.flush.take() {
        let _ = reply.send(Err(EncodeError::Worker("encoder thread exited".to_string())));
    }
}

fn run_worker(
    codecs: Arc<dyn CodecFactory>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<Event>,
) {
    let mut encoder: Option<FrameEncoder> = None;
    let mut fault: Option<String> = None;

    while let Some(command) = commands.blocking_recv() {
        match command {
            Command::Init(params) => match FrameEncoder::new(codecs.as_ref(), params) {
                Ok(created) => {
                    encoder = Some(created);
                    let _ = events.send(Event::Ready);
                }
                Err(e) => {
                    let _ = events.send(Event::Error(e.to_string()));
                    return;
                }
            },
            Command::Append(samples) => {
                if fault.is_some() {
                    continue;
                }
                if let Some(active) = encoder.as_mut() {
                    if let Err(e) = active.append(&samples) {
                        let message = e.to_string();
                        fault = Some(message.clone());
                        encoder = None;
                        let _ = events.send(Event::Error(message));
                    }
                }
            }
            Command::Flush => {
                let event = match (fault.take(), encoder.take()) {
                    (Some(message), _) => Event::Error(message),
                    (None, Some(active)) => match active.finish() {
                        Ok(bytes) => Event::Flushed(bytes),
                        Err(e) => Event::Error(e.to_string()),
                    },
                    (None, None) => Event::Error(EncodeError::NotInitialized.to_string()),
                };
                let _ = events.send(event);
                return;
            }
            Command::Close => return,
        }
    }
}
