//! Raw-sample tap over the stream's PCM fan-out

use std::sync::{Arc, Mutex};

use crate::application::capture::{FanOutSubscription, PcmFanOut};
use crate::application::ports::{
    BufferCallback, CaptureError, MicrophoneStream, NativeSampleTap, SampleTapHost,
};

/// Creates taps that re-chunk device buffers to a fixed size
#[derive(Debug, Default)]
pub struct FanOutTapHost;

impl FanOutTapHost {
    pub fn new() -> Self {
        Self
    }
}

impl SampleTapHost for FanOutTapHost {
    fn is_supported(&self) -> bool {
        true
    }

    fn create(&self, stream: &dyn MicrophoneStream) -> Result<Box<dyn NativeSampleTap>, CaptureError> {
        Ok(Box::new(FanOutTap {
            fan_out: stream.pcm().clone(),
            subscription: None,
        }))
    }
}

pub struct FanOutTap {
    fan_out: PcmFanOut,
    subscription: Option<FanOutSubscription>,
}

impl NativeSampleTap for FanOutTap {
    fn connect(&mut self, buffer_size: usize, on_buffer: BufferCallback) -> Result<(), CaptureError> {
        if buffer_size == 0 {
            return Err(CaptureError::Failed("Tap buffer size must be positive".to_string()));
        }
        if self.subscription.is_some() {
            return Err(CaptureError::Failed("Tap already connected".to_string()));
        }

        let staging = Mutex::new(Vec::<f32>::with_capacity(buffer_size * 2));
        self.subscription = Some(self.fan_out.subscribe(Arc::new(move |samples: &[f32]| {
            let ready: Vec<Vec<f32>> = {
                let mut staging = staging.lock().unwrap_or_else(|p| p.into_inner());
                staging.extend_from_slice(samples);
                let full = staging.len() / buffer_size * buffer_size;
                staging
                    .drain(..full)
                    .collect::<Vec<f32>>()
                    .chunks(buffer_size)
                    .map(<[f32]>::to_vec)
                    .collect()
            };
            for buffer in ready {
                on_buffer(&buffer);
            }
        })));
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn delivers_fixed_size_buffers() {
        let fan_out = PcmFanOut::new();
        let mut tap = FanOutTapHost::new().create(&Stream(fan_out.clone())).unwrap();
        let sizes = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&sizes);
        tap.connect(4, Arc::new(move |buffer: &[f32]| seen.lock().unwrap().push(buffer.len())))
            .unwrap();

        fan_out.publish(&[0.0; 3]);
        fan_out.publish(&[0.0; 6]);
        fan_out.publish(&[0.0; 1]);
        assert_eq!(*sizes.lock().unwrap(), vec![4, 4]);

        tap.disconnect();
        tap.disconnect();
        fan_out.publish(&[0.0; 8]);
        assert_eq!(sizes.lock().unwrap().len(), 2);
        assert_eq!(fan_out.listener_count(), 0);
    }

    #[test]
    fn rejects_zero_buffer() {
        let fan_out = PcmFanOut::new();
        let mut tap = FanOutTapHost::new().create(&Stream(fan_out)).unwrap();
        assert!(tap.connect(0, Arc::new(|_: &[f32]| {})).is_err());
    }
}
