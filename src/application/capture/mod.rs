//! Capture source drivers
//!
//! Two independent strategies read the same microphone stream: the blob
//! driver collects opaque chunks from the host's recorder, the tap driver
//! forwards raw PCM into the live encode session.

pub mod blob_driver;
pub mod fan_out;
pub mod live_sink;
pub mod tap_driver;

pub use blob_driver::BlobDriver;
pub use fan_out::{FanOutSubscription, PcmFanOut, PcmListener};
pub use live_sink::LiveSink;
pub use tap_driver::TapDriver;
