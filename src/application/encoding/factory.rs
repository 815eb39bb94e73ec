//! Encode session factory with worker-to-inline fallback

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use super::inline::InlineEncodeSession;
use super::worker::{WorkerEncodeSession, DEFAULT_WORKER_INIT_TIMEOUT};
use crate::application::ports::{
    CodecFactory, EncodeError, EncodeParams, EncodeSession, EncodeSessionFactory,
};

/// Creates initialized MP3 encode sessions.
///
/// With `prefer_worker` a dedicated encoder thread is tried first; any
/// failure there (spawn, codec init, timeout) falls back to an inline
/// session. Only an inline failure is reported to the caller.
pub struct Mp3EncodeSessionFactory {
    codecs: Arc<dyn CodecFactory>,
    prefer_worker: bool,
    worker_init_timeout: Duration,
}

impl Mp3EncodeSessionFactory {
    pub fn new(codecs: Arc<dyn CodecFactory>, prefer_worker: bool) -> Self {
        Self {
            codecs,
            prefer_worker,
            worker_init_timeout: DEFAULT_WORKER_INIT_TIMEOUT,
        }
    }

    pub fn with_worker_init_timeout(mut self, timeout: Duration) -> Self {
        self.worker_init_timeout = timeout;
        self
    }

    async fn create_worker(&self, params: EncodeParams) -> Result<WorkerEncodeSession, EncodeError> {
        let session =
            WorkerEncodeSession::spawn(Arc::clone(&self.codecs), params, self.worker_init_timeout)?;
        session.initialize().await?;
        Ok(session)
    }
}

#[async_trait]
impl EncodeSessionFactory for Mp3EncodeSessionFactory {
    async fn create(&self, params: EncodeParams) -> Result<Arc<dyn EncodeSession>, EncodeError> {
        if self.prefer_worker {
            match self.create_worker(params).await {
                Ok(session) => return Ok(Arc::new(session)),
                Err(e) => warn!(error = %e, "encoder worker unavailable, encoding inline"),
            }
        }

        let session = InlineEncodeSession::new(Arc::clone(&self.codecs), params);
        session.initialize().await?;
        info!(bitrate_kbps = params.bitrate_kbps, "using inline encoder");
        Ok(Arc::new(session))
    }
}
