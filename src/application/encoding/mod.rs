//! Incremental MP3 encoding
//!
//! An encode session turns a stream of mono f32 buffers into MP3 bytes.
//! Sessions run either on a dedicated encoder thread or inline on the
//! async runtime; the factory picks one and falls back when needed.

pub mod factory;
pub mod frame_encoder;
pub mod inline;
pub mod pcm;
pub mod resample;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use factory::Mp3EncodeSessionFactory;
pub use frame_encoder::{FrameEncoder, FRAME_SAMPLES};
pub use inline::InlineEncodeSession;
pub use worker::{WorkerEncodeSession, DEFAULT_WORKER_INIT_TIMEOUT};
