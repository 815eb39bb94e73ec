//! Recorder controller use case
//!
//! Owns the recording lifecycle and runs both capture paths against one
//! microphone stream. Every mutation happens under one lock; snapshots are
//! queued under that same lock and delivered outside it, so subscribers see
//! them in mutation order.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::{Duration as StdDuration, Instant as StdInstant};

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant};
use tracing::{debug, info, warn};

use super::capture::{BlobDriver, LiveSink, PcmListener, TapDriver};
use super::finalize::{enforce_size_limit, finalize};
use super::ports::{
    BlobDecoder, ChunkedRecorderHost, EncodeParams, EncodeSessionFactory, MicrophoneAccess,
    MicrophoneStream, SampleTapHost,
};
use super::session::{Session, SessionParams};
use crate::domain::error::RecorderError;
use crate::domain::recording::{
    peak_bins, Lifecycle, Mp3Recording, Phase, RecorderOptions, RecorderState,
};

/// Minimum spacing between visualization updates
pub const LEVEL_UPDATE_INTERVAL: StdDuration = StdDuration::from_millis(50);

/// Listener for state snapshots
pub type StateListener = Arc<dyn Fn(&RecorderState) + Send + Sync>;

/// Host capabilities the controller drives
#[derive(Clone)]
pub struct RecorderHost {
    pub microphone: Arc<dyn MicrophoneAccess>,
    pub chunked_recorder: Arc<dyn ChunkedRecorderHost>,
    pub sample_tap: Arc<dyn SampleTapHost>,
    pub decoder: Arc<dyn BlobDecoder>,
    pub encoders: Arc<dyn EncodeSessionFactory>,
}

struct Core {
    lifecycle: Lifecycle,
    state: RecorderState,
    options: RecorderOptions,
    session: Option<Session>,
    next_session_id: u64,
    listeners: Vec<(u64, StateListener)>,
    next_listener_id: u64,
}

struct Notice {
    snapshot: RecorderState,
    listeners: Vec<StateListener>,
}

#[derive(Default)]
struct Outbox {
    queue: VecDeque<Notice>,
    draining: bool,
}

struct Inner {
    host: RecorderHost,
    runtime: Handle,
    core: Mutex<Core>,
    outbox: Mutex<Outbox>,
    destroyed: AtomicBool,
    states: watch::Sender<RecorderState>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}

/// Microphone-to-MP3 recorder.
///
/// Public methods never fail; every problem ends up in
/// [`RecorderState::error`]. After [`destroy`](Self::destroy) all methods
/// are no-ops and no snapshot is delivered again.
#[derive(Clone)]
pub struct RecorderController {
    inner: Arc<Inner>,
}

impl RecorderController {
    /// Create a controller bound to the current Tokio runtime.
    ///
    /// Panics when called outside a runtime.
    pub fn new(host: RecorderHost, options: RecorderOptions) -> Self {
        let (states, _) = watch::channel(RecorderState::default());
        Self {
            inner: Arc::new(Inner {
                host,
                runtime: Handle::current(),
                core: Mutex::new(Core {
                    lifecycle: Lifecycle::new(),
                    state: RecorderState::default(),
                    options,
                    session: None,
                    next_session_id: 0,
                    listeners: Vec::new(),
                    next_listener_id: 0,
                }),
                outbox: Mutex::new(Outbox::default()),
                destroyed: AtomicBool::new(false),
                states,
            }),
        }
    }

    /// Acquire the microphone and start both capture paths.
    ///
    /// Ignored unless idle.
    pub async fn start(&self) {
        self.inner.start().await;
    }

    /// Request a stop. Ignored unless recording.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Start when idle, stop when recording, otherwise nothing
    pub async fn toggle_recording(&self) {
        let phase = self.phase();
        match phase {
            Phase::Idle => self.start().await,
            Phase::Recording => self.stop(),
            _ => debug!(%phase, "toggle ignored"),
        }
    }

    pub fn clear_error(&self) {
        let mut core = self.inner.core();
        if core.lifecycle.is_destroyed() || core.state.error.is_none() {
            return;
        }
        core.state.error = None;
        self.inner.publish(&core);
        drop(core);
        self.inner.deliver();
    }

    /// Tear everything down. Idempotent.
    pub fn destroy(&self) {
        self.inner.destroy();
    }

    /// Replace the configuration. Rates and bitrate apply from the next
    /// start; the callback and both limits take effect immediately.
    pub fn update_options(&self, options: RecorderOptions) {
        let mut core = self.inner.core();
        if core.lifecycle.is_destroyed() {
            return;
        }
        debug!(?options, "options updated");
        core.options = options;
    }

    pub fn get_state(&self) -> RecorderState {
        self.inner.core().state.clone()
    }

    pub fn phase(&self) -> Phase {
        self.inner.core().lifecycle.phase()
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.core().lifecycle.is_destroyed()
    }

    /// Register `listener`. It receives the current snapshot first, in
    /// order with any snapshot already queued, then every change until
    /// unsubscribed or destroyed.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&RecorderState) + Send + Sync + 'static,
    {
        let listener: StateListener = Arc::new(listener);
        let id = {
            let mut core = self.inner.core();
            if core.lifecycle.is_destroyed() {
                return Subscription {
                    inner: Weak::new(),
                    id: 0,
                };
            }
            let id = core.next_listener_id;
            core.next_listener_id += 1;
            core.listeners.push((id, Arc::clone(&listener)));
            // queued under the lock so later snapshots cannot overtake it
            lock(&self.inner.outbox).queue.push_back(Notice {
                snapshot: core.state.clone(),
                listeners: vec![listener],
            });
            id
        };
        self.inner.deliver();
        Subscription {
            inner: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Latest snapshot as a watch channel
    pub fn watch(&self) -> watch::Receiver<RecorderState> {
        self.inner.states.subscribe()
    }
}

/// Handle returned by [`RecorderController::subscribe`]
pub struct Subscription {
    inner: Weak<Inner>,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.core().listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

impl Inner {
    fn core(&self) -> MutexGuard<'_, Core> {
        lock(&self.core)
    }

    /// Queue the current snapshot. Must be called with the core lock held.
    fn publish(&self, core: &Core) {
        let snapshot = core.state.clone();
        self.states.send_replace(snapshot.clone());
        let listeners = core.listeners.iter().map(|(_, l)| Arc::clone(l)).collect();
        lock(&self.outbox).queue.push_back(Notice {
            snapshot,
            listeners,
        });
    }

    /// Deliver queued snapshots in order. Must be called without the core
    /// lock; a delivery already running on another call picks up the rest.
    fn deliver(&self) {
        {
            let mut outbox = lock(&self.outbox);
            if outbox.draining {
                return;
            }
            outbox.draining = true;
        }
        loop {
            let notice = {
                let mut outbox = lock(&self.outbox);
                match outbox.queue.pop_front() {
                    Some(notice) => notice,
                    None => {
                        outbox.draining = false;
                        return;
                    }
                }
            };
            for listener in &notice.listeners {
                if self.destroyed.load(Ordering::SeqCst) {
                    lock(&self.outbox).draining = false;
                    return;
                }
                listener(&notice.snapshot);
            }
        }
    }

    async fn start(self: &Arc<Self>) {
        let (session_id, options) = {
            let mut core = self.core();
            if let Err(e) = core.lifecycle.begin_start() {
                debug!(error = %e, "start ignored");
                return;
            }
            if !self.host.microphone.is_available() {
                let _ = core.lifecycle.start_failed();
                core.state.error = Some(RecorderError::microphone_unavailable().to_string());
                self.publish(&core);
                drop(core);
                self.deliver();
                return;
            }
            core.next_session_id += 1;
            (core.next_session_id, core.options.clone())
        };

        match self.open_session(session_id, &options).await {
            Ok(session) => self.complete_start(session, &options),
            Err(err) => self.fail_start(err),
        }
    }

    async fn open_session(
        self: &Arc<Self>,
        session_id: u64,
        options: &RecorderOptions,
    ) -> Result<Session, RecorderError> {
        let stream = self.host.microphone.acquire().await?;
        let params = SessionParams {
            capture_rate: stream.sample_rate(),
            target_rate: options.sample_rate,
            bitrate_kbps: options.bitrate_kbps,
        };
        debug!(session = session_id, ?params, "microphone acquired");
        let mut session = Session::new(session_id, params, stream);

        if let Some(stream) = session.stream() {
            match self.start_blob(stream, session_id, options) {
                Ok(Some(blob)) => session.attach_blob(blob),
                Ok(None) => debug!("chunked recorder unsupported"),
                Err(e) => warn!(error = %e, "chunked recorder failed to start"),
            }
        }

        let live = match session.stream() {
            Some(stream) => self.start_live(stream, params, options).await,
            None => Err(RecorderError::recording_unsupported()),
        };
        let live_error = match live {
            Ok(tap) => {
                session.attach_tap(tap);
                None
            }
            Err(e) => {
                debug!(error = %e, "live encoding unavailable");
                Some(e)
            }
        };

        if !session.has_blob() && !session.has_live() {
            // dropping the session releases the stream
            return Err(live_error.unwrap_or_else(RecorderError::recording_unsupported));
        }

        if let Some(stream) = session.stream() {
            let meter = stream
                .pcm()
                .subscribe(level_meter(Arc::downgrade(self), session_id));
            session.attach_meter(meter);
        }
        Ok(session)
    }

    fn start_blob(
        self: &Arc<Self>,
        stream: &dyn MicrophoneStream,
        session_id: u64,
        options: &RecorderOptions,
    ) -> Result<Option<BlobDriver>, RecorderError> {
        let host = self.host.chunked_recorder.as_ref();
        if !host.is_supported() {
            return Ok(None);
        }
        let weak = Arc::downgrade(self);
        let on_complete = Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.blob_stopped(session_id);
            }
        });
        let blob = BlobDriver::start(host, stream, options.timeslice, on_complete)?;
        Ok(Some(blob))
    }

    async fn start_live(
        &self,
        stream: &dyn MicrophoneStream,
        params: SessionParams,
        options: &RecorderOptions,
    ) -> Result<TapDriver, RecorderError> {
        let host = self.host.sample_tap.as_ref();
        if !host.is_supported() {
            return Err(RecorderError::recording_unsupported());
        }

        let encoder = self
            .host
            .encoders
            .create(EncodeParams {
                source_rate: params.capture_rate,
                target_rate: params.target_rate,
                bitrate_kbps: params.bitrate_kbps,
            })
            .await
            .map_err(|e| RecorderError::EncoderFault(e.to_string()))?;
        debug!(encoder = %encoder.kind(), "live encoder ready");

        let sink = Arc::new(LiveSink::new(Arc::clone(&encoder)));
        TapDriver::start(host, stream, options.tap_buffer_size, sink).map_err(|e| {
            encoder.close();
            RecorderError::from(e)
        })
    }

    fn complete_start(self: &Arc<Self>, mut session: Session, options: &RecorderOptions) {
        let mut core = self.core();
        if core.lifecycle.is_destroyed() {
            drop(core);
            debug!(session = session.id(), "destroyed while starting");
            session.abort();
            return;
        }

        let ticker = self.spawn_elapsed_ticker(session.id(), options.elapsed_poll);
        session.attach_ticker(ticker);
        info!(
            session = session.id(),
            blob = session.has_blob(),
            live = session.has_live(),
            "recording started"
        );

        let _ = core.lifecycle.start_succeeded();
        core.session = Some(session);
        core.state = RecorderState::recording();
        self.publish(&core);
        drop(core);
        self.deliver();
    }

    fn fail_start(&self, err: RecorderError) {
        let mut core = self.core();
        if core.lifecycle.is_destroyed() {
            return;
        }
        warn!(error = %err, "recording failed to start");
        let _ = core.lifecycle.start_failed();
        core.state.error = Some(err.to_string());
        self.publish(&core);
        drop(core);
        self.deliver();
    }

    fn spawn_elapsed_ticker(self: &Arc<Self>, session_id: u64, poll: StdDuration) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        self.runtime.spawn(async move {
            let started = Instant::now();
            let mut ticks = interval(poll);
            ticks.tick().await;
            loop {
                ticks.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                if !inner.tick_elapsed(session_id, started.elapsed().as_secs()) {
                    break;
                }
            }
        })
    }

    /// Update the elapsed counter. Returns false once the poll should end.
    fn tick_elapsed(self: &Arc<Self>, session_id: u64, elapsed_secs: u64) -> bool {
        let mut core = self.core();
        if !core.lifecycle.is_recording() || !owns_session(&core, session_id) {
            return false;
        }
        if core.state.elapsed_seconds != elapsed_secs {
            core.state.elapsed_seconds = elapsed_secs;
            self.publish(&core);
        }
        let limit = core.options.max_duration;
        drop(core);
        self.deliver();

        if limit.is_reached_by(elapsed_secs) {
            info!(limit = %limit, "maximum duration reached, stopping");
            self.stop();
            return false;
        }
        true
    }

    fn update_levels(&self, session_id: u64, levels: Vec<u8>) {
        let mut core = self.core();
        if !core.lifecycle.is_recording() || !owns_session(&core, session_id) {
            return;
        }
        core.state.audio_levels = levels;
        self.publish(&core);
        drop(core);
        self.deliver();
    }

    fn stop(self: &Arc<Self>) {
        let Some((session_id, blob)) = self.request_stop() else {
            return;
        };
        match blob {
            Some(blob) => blob.stop(),
            None => self.begin_finalize(session_id),
        }
    }

    /// Enter finalizing and stop capture. Returns the session id and the
    /// blob driver that still has to be stopped, if any.
    fn request_stop(&self) -> Option<(u64, Option<Arc<BlobDriver>>)> {
        let stopped = {
            let mut core = self.core();
            if core.lifecycle.request_stop().is_err() {
                debug!(phase = %core.lifecycle.phase(), "stop ignored");
                return None;
            }
            core.state.enter_processing();
            let stopped = core
                .session
                .as_mut()
                .map(|session| (session.id(), session.stop_capture()));
            self.publish(&core);
            stopped
        };
        self.deliver();
        if let Some((session_id, _)) = &stopped {
            debug!(session = session_id, "stop requested");
        }
        stopped
    }

    /// Completion of the chunked recorder. A stop the host initiated on its
    /// own is handled like a user stop.
    fn blob_stopped(self: &Arc<Self>, session_id: u64) {
        let phase = {
            let core = self.core();
            if !owns_session(&core, session_id) {
                return;
            }
            core.lifecycle.phase()
        };
        if phase == Phase::Recording {
            warn!(session = session_id, "chunked recorder stopped on its own");
            self.request_stop();
        }
        self.begin_finalize(session_id);
    }

    /// Move the session out and run finalization. Only the first call for
    /// a session gets past the ownership check.
    fn begin_finalize(self: &Arc<Self>, session_id: u64) {
        let session = {
            let mut core = self.core();
            if !core.lifecycle.is_finalizing() || !owns_session(&core, session_id) {
                return;
            }
            core.session.take()
        };
        let Some(session) = session else { return };

        let inner = Arc::clone(self);
        self.runtime.spawn(async move {
            inner.run_finalize(session).await;
        });
    }

    async fn run_finalize(&self, session: Session) {
        let session_id = session.id();
        let outcome = finalize(
            &session,
            self.host.decoder.as_ref(),
            self.host.encoders.as_ref(),
        )
        .await;
        session.release();
        self.complete_finalize(session_id, outcome);
    }

    fn complete_finalize(&self, session_id: u64, outcome: Result<Mp3Recording, RecorderError>) {
        let mut core = self.core();
        if core.lifecycle.is_destroyed() {
            debug!(
                session = session_id,
                finished = outcome.is_ok(),
                error = %RecorderError::Cancelled,
                "destroyed during finalization, result dropped"
            );
            return;
        }

        let outcome = outcome.and_then(|rec| enforce_size_limit(rec, core.options.max_size_bytes));
        let _ = core.lifecycle.finish();
        core.state.enter_idle();
        let delivery = match outcome {
            Ok(recording) => {
                core.state.error = None;
                info!(
                    session = session_id,
                    size = %recording.human_readable_size(),
                    duration_sec = recording.metadata().duration_sec,
                    "recording complete"
                );
                Some((Arc::clone(&core.options.on_recording_complete), recording))
            }
            Err(e) => {
                warn!(session = session_id, error = %e, "recording failed");
                core.state.error = Some(e.to_string());
                None
            }
        };
        self.publish(&core);
        drop(core);

        if let Some((callback, recording)) = delivery {
            let (bytes, metadata) = recording.into_parts();
            callback(bytes, metadata);
        }
        self.deliver();
    }

    fn destroy(&self) {
        let session = {
            let mut core = self.core();
            let Some(previous) = core.lifecycle.destroy() else {
                return;
            };
            info!(phase = %previous, "recorder destroyed");
            self.destroyed.store(true, Ordering::SeqCst);
            core.listeners.clear();
            core.session.take()
        };
        lock(&self.outbox).queue.clear();
        if let Some(session) = session {
            session.abort();
        }
    }
}

fn owns_session(core: &Core, session_id: u64) -> bool {
    core.session.as_ref().map(Session::id) == Some(session_id)
}

/// Fan-out listener feeding throttled peak bins into the snapshot
fn level_meter(inner: Weak<Inner>, session_id: u64) -> PcmListener {
    let last_update: Mutex<Option<StdInstant>> = Mutex::new(None);
    Arc::new(move |samples: &[f32]| {
        {
            let mut last = lock(&last_update);
            let now = StdInstant::now();
            if last.is_some_and(|at| now.duration_since(at) < LEVEL_UPDATE_INTERVAL) {
                return;
            }
            *last = Some(now);
        }
        if let Some(inner) = inner.upgrade() {
            inner.update_levels(session_id, peak_bins(samples));
        }
    })
}
