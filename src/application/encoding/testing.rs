//! Deterministic codec used by the encoder unit tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::application::ports::{CodecConfig, CodecError, CodecFactory, PcmCodec};

pub const FRAME_MARKER: u8 = 0xFB;
pub const FLUSH_MARKER: u8 = 0xFF;

/// Emits one marker byte per frame and one on flush
#[derive(Default)]
pub struct FrameCountingCodecs {
    failures_left: AtomicUsize,
    encode_fails: AtomicBool,
}

impl FrameCountingCodecs {
    /// Reject the first `n` codec creations
    pub fn failing(n: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(n),
            encode_fails: AtomicBool::new(false),
        }
    }

    /// Codecs whose frame encoding always fails
    pub fn faulty() -> Self {
        Self {
            failures_left: AtomicUsize::new(0),
            encode_fails: AtomicBool::new(true),
        }
    }
}

impl CodecFactory for FrameCountingCodecs {
    fn create(&self, _config: CodecConfig) -> Result<Box<dyn PcmCodec>, CodecError> {
        let rejected = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if rejected {
            return Err(CodecError::Config("rejected".to_string()));
        }
        Ok(Box::new(MarkerCodec {
            fail: self.encode_fails.load(Ordering::SeqCst),
        }))
    }
}

struct MarkerCodec {
    fail: bool,
}

impl PcmCodec for MarkerCodec {
    fn encode_frame(&mut self, _samples: &[i16]) -> Result<Vec<u8>, CodecError> {
        if self.fail {
            return Err(CodecError::Encode("broken".to_string()));
        }
        Ok(vec![FRAME_MARKER])
    }

    fn flush(&mut self) -> Result<Vec<u8>, CodecError> {
        Ok(vec![FLUSH_MARKER])
    }
}
