// crates/luminorder-core/src/lib.rs
//
// Pure data and policy: frame records, the rounded-bucket sort, the offsets
// sidecar format, job state/event/error types, and progress formatting.
// No ffmpeg, no threads — luminorder-media depends on this, never the reverse.

pub mod config;
pub mod job;
pub mod offsets;
pub mod progress;
pub mod record;

// Re-export the types every consumer needs so imports stay shallow.
pub use config::JobConfig;
pub use job::{exit_code, JobError, JobEvent, JobState, Phase};
pub use record::{sort_table, FrameRecord};
