//! Blob decoding adapters

mod symphonia;

pub use self::symphonia::{repair_streaming_wav, SymphoniaDecoder};
