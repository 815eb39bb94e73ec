//! Gate between the raw-sample tap and the live encode session

use std::sync::{Arc, Mutex};

use crate::application::ports::EncodeSession;

struct Gate {
    session: Option<Arc<dyn EncodeSession>>,
    open: bool,
    frames: u64,
}

/// Forwards tapped buffers to the live encode session until sealed.
///
/// Appends and the seal take the same lock, so once `seal` returns no
/// further append can reach the session and a following flush sees
/// exactly the frames counted here.
pub struct LiveSink {
    gate: Mutex<Gate>,
}

impl LiveSink {
    pub fn new(session: Arc<dyn EncodeSession>) -> Self {
        Self {
            gate: Mutex::new(Gate {
                session: Some(session),
                open: true,
                frames: 0,
            }),
        }
    }

    /// Forward one buffer. Returns false once sealed.
    pub fn push(&self, samples: &[f32]) -> bool {
        let mut gate = self.gate.lock().unwrap_or_else(|p| p.into_inner());
        if !gate.open {
            return false;
        }
        let Some(session) = gate.session.as_ref() else {
            return false;
        };
        session.append_pcm(samples);
        gate.frames += samples.len() as u64;
        true
    }

    /// Close the gate and hand over the session with its frame count.
    /// A second seal returns `None`.
    pub fn seal(&self) -> Option<(Arc<dyn EncodeSession>, u64)> {
        let mut gate = self.gate.lock().unwrap_or_else(|p| p.into_inner());
        gate.open = false;
        let frames = gate.frames;
        gate.session.take().map(|session| (session, frames))
    }

    #[cfg(test)]
    pub fn frames(&self) -> u64 {
        self.gate.lock().unwrap_or_else(|p| p.into_inner()).frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{EncodeError, EncoderKind};
    use async_trait::async_trait;

    #[derive(Default)]
    struct Recording {
        appended: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl EncodeSession for Recording {
        async fn initialize(&self) -> Result<(), EncodeError> {
            Ok(())
        }
        fn append_pcm(&self, samples: &[f32]) {
            self.appended.lock().unwrap().push(samples.len());
        }
        async fn flush(&self) -> Result<Vec<u8>, EncodeError> {
            Ok(Vec::new())
        }
        fn close(&self) {}
        fn kind(&self) -> EncoderKind {
            EncoderKind::Inline
        }
    }

    #[test]
    fn counts_frames_until_sealed() {
        let session = Arc::new(Recording::default());
        let sink = LiveSink::new(session.clone());

        assert!(sink.push(&[0.0; 4096]));
        assert!(sink.push(&[0.0; 4096]));
        assert_eq!(sink.frames(), 8192);

        let (_, frames) = sink.seal().unwrap();
        assert_eq!(frames, 8192);
        assert!(!sink.push(&[0.0; 4096]));
        assert_eq!(*session.appended.lock().unwrap(), vec![4096, 4096]);
    }

    #[test]
    fn seal_is_single_use() {
        let sink = LiveSink::new(Arc::new(Recording::default()));
        assert!(sink.seal().is_some());
        assert!(sink.seal().is_none());
    }
}
