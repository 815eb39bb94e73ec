//! Application layer - Use cases and port interfaces
//!
//! Contains the recorder controller, the capture drivers and encode
//! sessions it orchestrates, and the traits (ports) for host adapters.

pub mod capture;
pub mod controller;
pub mod encoding;
pub mod finalize;
pub mod ports;
pub mod session;

pub use controller::{RecorderController, RecorderHost, StateListener, Subscription};
pub use encoding::Mp3EncodeSessionFactory;
