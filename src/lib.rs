// Vigil Cam - Library Entry Point

pub mod constants;
pub mod error;
pub mod tools;
pub mod frame;
pub mod probe;
pub mod source;
pub mod detect;
pub mod severity;
pub mod buffer;
pub mod state;
pub mod alert;
pub mod pipeline;

pub use alert::AlertDispatcher;
pub use buffer::FrameRingBuffer;
pub use detect::batcher::DetectionBatcher;
pub use error::{Result, VigilError};
pub use frame::Frame;
pub use pipeline::{run_watch_loop, PipelineConfig, WatchSummary};
pub use severity::{SeverityLevel, SeverityThresholds, SeverityTracker, SeverityVerdict};
pub use state::{AlertSettings, WatchState};
