//! Record runner

use std::env;
use std::io::{self, IsTerminal};
use std::process::ExitCode;
use std::sync::Mutex;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::application::ports::ConfigStore;
use crate::application::RecorderController;
use crate::domain::config::{validate_bitrate, validate_sample_rate, AppConfig, EncoderPreference};
use crate::domain::error::ConfigError;
use crate::domain::recording::output::human_readable_size;
use crate::domain::recording::{Duration, RecorderOptions, RecordingMetadata};
use crate::infrastructure::{default_host, XdgConfigStore};

use super::presenter::Presenter;
use super::signals::StopSignal;

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

/// Environment overrides
pub const ENV_BITRATE: &str = "MP3_CAPTURE_BITRATE";
pub const ENV_SAMPLE_RATE: &str = "MP3_CAPTURE_SAMPLE_RATE";

/// Fully validated settings for one recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOptions {
    pub max_duration: Duration,
    pub max_size_bytes: u64,
    pub bitrate_kbps: u32,
    pub sample_rate: u32,
    pub encoder: EncoderPreference,
    pub json: bool,
}

impl RecordOptions {
    /// Validate a merged config. Unset keys take their defaults; set but
    /// invalid keys are errors.
    pub fn from_config(config: &AppConfig, json: bool) -> Result<Self, ConfigError> {
        let max_duration = match config.max_duration.as_deref() {
            Some(text) => {
                text.parse::<Duration>()
                    .map_err(|e| ConfigError::ValidationError {
                        key: "max_duration".to_string(),
                        message: e.to_string(),
                    })?
            }
            None => Duration::default_max_duration(),
        };
        if config.max_size_bytes == Some(0) {
            return Err(ConfigError::ValidationError {
                key: "max_size_bytes".to_string(),
                message: "Value must be greater than zero".to_string(),
            });
        }
        let bitrate_kbps = match config.bitrate {
            Some(bitrate) => validate_bitrate(bitrate)?,
            None => config.bitrate_or_default(),
        };
        let sample_rate = match config.sample_rate {
            Some(rate) => validate_sample_rate(rate)?,
            None => config.sample_rate_or_default(),
        };
        let encoder = match config.encoder.as_deref() {
            Some(text) => text.parse()?,
            None => EncoderPreference::default(),
        };

        Ok(Self {
            max_duration,
            max_size_bytes: config.max_size_or_default(),
            bitrate_kbps,
            sample_rate,
            encoder,
            json,
        })
    }

    fn recorder_options<F>(&self, on_complete: F) -> RecorderOptions
    where
        F: Fn(Vec<u8>, RecordingMetadata) + Send + Sync + 'static,
    {
        RecorderOptions::new(on_complete)
            .with_max_duration(self.max_duration)
            .with_max_size_bytes(self.max_size_bytes)
            .with_bitrate(self.bitrate_kbps)
            .with_sample_rate(self.sample_rate)
    }
}

/// Record from the default microphone and write the MP3 to stdout
pub async fn run_record(options: RecordOptions) -> ExitCode {
    let mut presenter = Presenter::new();

    if io::stdout().is_terminal() {
        presenter.error("Refusing to write MP3 data to a terminal; redirect stdout, e.g. mp3-capture > memo.mp3");
        return ExitCode::from(EXIT_USAGE_ERROR);
    }

    let (done_tx, done_rx) = oneshot::channel();
    let done_tx = Mutex::new(Some(done_tx));
    let recorder_options = options.recorder_options(move |bytes, metadata| {
        let sender = done_tx.lock().unwrap_or_else(|p| p.into_inner()).take();
        if let Some(sender) = sender {
            let _ = sender.send((bytes, metadata));
        }
    });

    let host = default_host(options.encoder == EncoderPreference::Worker);
    let controller = RecorderController::new(host, recorder_options);
    let mut states = controller.watch();
    let mut stop = StopSignal::listen();

    controller.start().await;
    let started = controller.get_state();
    if !started.is_recording {
        let message = started
            .error
            .unwrap_or_else(|| "Recording did not start".to_string());
        presenter.error(&message);
        controller.destroy();
        return ExitCode::from(EXIT_ERROR);
    }

    let total_secs = options.max_duration.as_secs();
    presenter.start_spinner("Recording... (Enter or Ctrl+C to stop)");
    loop {
        tokio::select! {
            request = stop.recv() => {
                debug!(?request, "stop requested");
                controller.stop();
                break;
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = states.borrow_and_update().clone();
                if !state.is_recording {
                    break;
                }
                presenter.update_recording_progress(
                    state.elapsed_seconds,
                    total_secs,
                    &state.audio_levels,
                );
            }
        }
    }

    presenter.update_spinner("Encoding MP3...");
    let finished = loop {
        let state = states.borrow_and_update().clone();
        if state.is_idle() {
            break state;
        }
        if states.changed().await.is_err() {
            break controller.get_state();
        }
    };

    if let Some(message) = finished.error {
        presenter.spinner_fail(&message);
        controller.destroy();
        return ExitCode::from(EXIT_ERROR);
    }

    let delivered = done_rx.await;
    controller.destroy();
    let (bytes, metadata) = match delivered {
        Ok(result) => result,
        Err(_) => {
            presenter.spinner_fail("Recording finished without output");
            return ExitCode::from(EXIT_ERROR);
        }
    };

    presenter.spinner_success(&format!(
        "Recorded {}s ({})",
        metadata.duration_sec,
        human_readable_size(metadata.size_bytes)
    ));
    if options.json {
        match serde_json::to_string(&metadata) {
            Ok(json) => presenter.diagnostic(&json),
            Err(e) => warn!(error = %e, "metadata not serializable"),
        }
    }
    if let Err(e) = presenter.output_bytes(&bytes) {
        presenter.error(&format!("Failed to write MP3 data: {}", e));
        return ExitCode::from(EXIT_ERROR);
    }

    ExitCode::from(EXIT_SUCCESS)
}

fn env_number(name: &str) -> Option<u32> {
    let value = env::var(name).ok().filter(|s| !s.trim().is_empty())?;
    match value.trim().parse() {
        Ok(number) => Some(number),
        Err(_) => {
            warn!(variable = name, value = %value, "ignoring non-numeric override");
            None
        }
    }
}

/// Config from the `MP3_CAPTURE_*` environment variables
pub fn env_config() -> AppConfig {
    AppConfig {
        bitrate: env_number(ENV_BITRATE),
        sample_rate: env_number(ENV_SAMPLE_RATE),
        ..Default::default()
    }
}

/// Load and merge configuration from file, env, and CLI
pub async fn load_merged_config(cli_config: AppConfig) -> AppConfig {
    let store = XdgConfigStore::new();
    let file_config = store.load_or_empty().await;

    // Merge: defaults < file < env < cli
    AppConfig::defaults()
        .merge(file_config)
        .merge(env_config())
        .merge(cli_config)
}
