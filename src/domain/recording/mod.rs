//! Recording domain: lifecycle, snapshots, limits and results

pub mod chunks;
pub mod duration;
pub mod levels;
pub mod lifecycle;
pub mod options;
pub mod output;
pub mod state;

pub use chunks::ChunkBuffer;
pub use duration::Duration;
pub use levels::{peak_bins, LEVEL_BINS};
pub use lifecycle::{InvalidStateTransition, Lifecycle, Phase};
pub use options::{CompletionCallback, RecorderOptions};
pub use output::{AudioMimeType, Mp3Recording, RecordingMetadata};
pub use state::RecorderState;
