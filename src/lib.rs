//! mp3-capture - microphone capture straight to MP3
//!
//! This crate records the microphone through two racing capture paths
//! (live PCM encoding and chunked capture with decode) and hands the
//! finished MP3 bytes to a callback.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Recorder lifecycle, state snapshots, limits, results and errors
//! - **Application**: The recorder controller, capture drivers, encode sessions and port interfaces (traits)
//! - **Infrastructure**: Adapter implementations (cpal, symphonia, LAME, XDG config)
//! - **CLI**: Command-line interface, argument parsing, and stop signals

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
