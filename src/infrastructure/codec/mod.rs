//! Codec adapters

mod lame;

pub use lame::{LameCodec, LameCodecFactory};
