//! Microphone access using cpal
//!
//! The cpal stream is not `Send`, so it lives on a dedicated thread for its
//! whole lifetime. The handle returned to the controller only carries the
//! fan-out and a shutdown signal.

use std::thread;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use tokio::sync::oneshot;
use tracing::{debug, error, info};

use crate::application::capture::PcmFanOut;
use crate::application::ports::{CaptureError, MicrophoneAccess, MicrophoneStream};

const CAPTURE_THREAD_NAME: &str = "mic-capture";

/// Default input device of the default cpal host
#[derive(Debug, Default)]
pub struct CpalMicrophone;

impl CpalMicrophone {
    pub fn new() -> Self {
        Self
    }

    fn input_device() -> Result<cpal::Device, CaptureError> {
        cpal::default_host()
            .default_input_device()
            .ok_or_else(|| CaptureError::Failed("No input device found".to_string()))
    }

    fn input_config(device: &cpal::Device) -> Result<(StreamConfig, SampleFormat), CaptureError> {
        let supported = device.default_input_config().map_err(|e| match e {
            cpal::DefaultStreamConfigError::DeviceNotAvailable => {
                CaptureError::Failed("Input device is not available".to_string())
            }
            other => backend_error(format!("Failed to get input config: {}", other)),
        })?;

        let sample_format = supported.sample_format();
        Ok((supported.into(), sample_format))
    }

    /// Average interleaved frames down to one channel
    fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
        if channels <= 1 {
            return samples.to_vec();
        }
        samples
            .chunks(channels as usize)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    }

    fn build_stream(
        device: &cpal::Device,
        config: &StreamConfig,
        sample_format: SampleFormat,
        fan_out: PcmFanOut,
    ) -> Result<cpal::Stream, CaptureError> {
        let channels = config.channels;
        let on_error = |err: cpal::StreamError| error!(error = %err, "audio stream error");

        let stream = match sample_format {
            SampleFormat::F32 => device.build_input_stream(
                config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    fan_out.publish(&Self::downmix(data, channels));
                },
                on_error,
                None,
            ),
            SampleFormat::I16 => device.build_input_stream(
                config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let normalized: Vec<f32> =
                        data.iter().map(|&s| s as f32 / 32768.0).collect();
                    fan_out.publish(&Self::downmix(&normalized, channels));
                },
                on_error,
                None,
            ),
            other => {
                return Err(CaptureError::Unsupported(format!(
                    "Sample format {:?}",
                    other
                )))
            }
        };

        stream.map_err(|e| match e {
            cpal::BuildStreamError::DeviceNotAvailable => {
                CaptureError::Failed("Input device is not available".to_string())
            }
            other => backend_error(other.to_string()),
        })
    }

    /// Body of the capture thread: open, report the rate, run until the
    /// shutdown signal fires or its sender is dropped.
    fn run_capture(
        fan_out: PcmFanOut,
        ready: oneshot::Sender<Result<u32, CaptureError>>,
        shutdown: oneshot::Receiver<()>,
    ) {
        let opened = Self::input_device().and_then(|device| {
            let (config, sample_format) = Self::input_config(&device)?;
            let stream = Self::build_stream(&device, &config, sample_format, fan_out)?;
            stream
                .play()
                .map_err(|e| backend_error(format!("Failed to start stream: {}", e)))?;
            Ok((stream, config.sample_rate.0, config.channels))
        });

        match opened {
            Ok((stream, sample_rate, channels)) => {
                info!(sample_rate, channels, "microphone opened");
                if ready.send(Ok(sample_rate)).is_err() {
                    return;
                }
                let _ = shutdown.blocking_recv();
                drop(stream);
                debug!("microphone closed");
            }
            Err(e) => {
                let _ = ready.send(Err(e));
            }
        }
    }
}

/// Backends report refused access only through their error text
fn backend_error(message: String) -> CaptureError {
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") {
        CaptureError::PermissionDenied
    } else {
        CaptureError::Failed(message)
    }
}

#[async_trait]
impl MicrophoneAccess for CpalMicrophone {
    fn is_available(&self) -> bool {
        Self::input_device().is_ok()
    }

    async fn acquire(&self) -> Result<Box<dyn MicrophoneStream>, CaptureError> {
        let fan_out = PcmFanOut::new();
        let (ready_tx, ready_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let publisher = fan_out.clone();
        thread::Builder::new()
            .name(CAPTURE_THREAD_NAME.to_string())
            .spawn(move || Self::run_capture(publisher, ready_tx, shutdown_rx))
            .map_err(|e| CaptureError::Failed(format!("Failed to spawn capture thread: {}", e)))?;

        let sample_rate = ready_rx
            .await
            .map_err(|_| CaptureError::Failed("Capture thread exited".to_string()))??;

        Ok(Box::new(CpalStream {
            sample_rate,
            fan_out,
            shutdown: Some(shutdown_tx),
        }))
    }
}

/// Handle to a running capture thread
struct CpalStream {
    sample_rate: u32,
    fan_out: PcmFanOut,
    shutdown: Option<oneshot::Sender<()>>,
}

impl MicrophoneStream for CpalStream {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn pcm(&self) -> &PcmFanOut {
        &self.fan_out
    }

    fn release(mut self: Box<Self>) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_single_channel() {
        let mono = vec![0.1, 0.2, 0.3];
        assert_eq!(CpalMicrophone::downmix(&mono, 1), mono);
    }

    #[test]
    fn downmix_two_channels() {
        let stereo = vec![0.25, 0.75, -1.0, 1.0];
        assert_eq!(CpalMicrophone::downmix(&stereo, 2), vec![0.5, 0.0]);
    }

    #[test]
    fn refused_access_is_permission_denied() {
        assert_eq!(
            backend_error("Access Denied by system policy".to_string()),
            CaptureError::PermissionDenied
        );
        assert_eq!(
            backend_error("device busy".to_string()),
            CaptureError::Failed("device busy".to_string())
        );
    }
}
