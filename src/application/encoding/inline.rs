//! Encode session running on the async runtime

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::frame_encoder::FrameEncoder;
use crate::application::ports::{
    CodecFactory, EncodeError, EncodeParams, EncodeSession, EncoderKind,
};

enum Job {
    Append(Vec<f32>),
    Flush(oneshot::Sender<Result<Vec<u8>, EncodeError>>),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}

/// Fallback encoder. Jobs are drained by a single task in submission
/// order; a failed job poisons the session until it is flushed or closed.
pub struct InlineEncodeSession {
    codecs: Arc<dyn CodecFactory>,
    params: EncodeParams,
    jobs: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    fault: Arc<Mutex<Option<String>>>,
    flushing: AtomicBool,
    closed: AtomicBool,
}

impl InlineEncodeSession {
    pub fn new(codecs: Arc<dyn CodecFactory>, params: EncodeParams) -> Self {
        Self {
            codecs,
            params,
            jobs: Mutex::new(None),
            fault: Arc::new(Mutex::new(None)),
            flushing: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl EncodeSession for InlineEncodeSession {
    async fn initialize(&self) -> Result<(), EncodeError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(EncodeError::Closed);
        }
        let mut jobs = lock(&self.jobs);
        if jobs.is_some() {
            return Ok(());
        }

        let encoder = FrameEncoder::new(self.codecs.as_ref(), self.params)?;
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(drain_jobs(encoder, rx, Arc::clone(&self.fault)));
        *jobs = Some(tx);
        debug!(
            source_rate = self.params.source_rate,
            target_rate = self.params.target_rate,
            "inline encoder ready"
        );
        Ok(())
    }

    fn append_pcm(&self, samples: &[f32]) {
        if self.flushing.load(Ordering::SeqCst) || self.closed.load(Ordering::SeqCst) {
            return;
        }
        if lock(&self.fault).is_some() {
            return;
        }
        if let Some(jobs) = lock(&self.jobs).as_ref() {
            let _ = jobs.send(Job::Append(samples.to_vec()));
        }
    }

    async fn flush(&self) -> Result<Vec<u8>, EncodeError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(EncodeError::Closed);
        }
        let Some(jobs) = lock(&self.jobs).clone() else {
            return Err(EncodeError::NotInitialized);
        };
        if self.flushing.swap(true, Ordering::SeqCst) {
            return Err(EncodeError::FlushInProgress);
        }

        let fault = lock(&self.fault).clone();
        if let Some(message) = fault {
            self.close();
            return Err(EncodeError::Faulted(message));
        }

        let (reply, flushed) = oneshot::channel();
        if jobs.send(Job::Flush(reply)).is_err() {
            self.close();
            return Err(EncodeError::Closed);
        }
        let result = flushed.await.unwrap_or(Err(EncodeError::Closed));
        self.close();
        result
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        lock(&self.jobs).take();
        debug!("inline encoder closed");
    }

    fn kind(&self) -> EncoderKind {
        EncoderKind::Inline
    }
}

async fn drain_jobs(
    encoder: FrameEncoder,
    mut jobs: mpsc::UnboundedReceiver<Job>,
    fault: Arc<Mutex<Option<String>>>,
) {
    let mut encoder = Some(encoder);
    while let Some(job) = jobs.recv().await {
        match job {
            Job::Append(samples) => {
                let Some(active) = encoder.as_mut() else {
                    continue;
                };
                if let Err(e) = active.append(&samples) {
                    warn!(error = %e, "inline encoder failed");
                    *lock(&fault) = Some(e.to_string());
                    encoder = None;
                }
            }
            Job::Flush(reply) => {
                let result = match encoder.take() {
                    Some(active) => active.finish(),
                    None => Err(EncodeError::Faulted(
                        lock(&fault).clone().unwrap_or_default(),
                    )),
                };
                let _ = reply.send(result);
                return;
            }
        }
    }
}
