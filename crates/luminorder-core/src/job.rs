// crates/luminorder-core/src/job.rs
//
// Job state machine, error kinds, and the events the worker sends to any
// observer. Plain data only — a CLI or GUI can render progress without
// touching ffmpeg.

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

/// Coarse progress label. Phases always advance in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Analyzing,
    Sorting,
    Writing,
}

impl Phase {
    pub fn tag(self) -> &'static str {
        match self {
            Phase::Loading   => "Loading",
            Phase::Analyzing => "Analyzing",
            Phase::Sorting   => "Sorting",
            Phase::Writing   => "Writing",
        }
    }
}

/// Everything that can sink a job. No retries anywhere — each of these
/// aborts the run and surfaces to the observer as `JobState::Failed`.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("input not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("input unreadable: {0}")]
    Unreadable(String),
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("decoder returned a zero-area surface")]
    EmptySurface,
    #[error("decode failed at frame {0}")]
    DecodeFailed(u64),
    #[error("output unwritable: {0}")]
    Unwritable(String),
    #[error("codec unavailable: {0}")]
    CodecUnavailable(String),
    #[error("encode failed at frame {0}")]
    EncodeFailed(u64),
    #[error("corrupt offsets file at line {line}")]
    CorruptOffsets { line: usize },
    #[error("a job is already running")]
    Busy,
    #[error("cancelled")]
    Cancelled,
}

/// Monotone: Idle → Loading → Analyzing → Sorting → Writing → Done,
/// with any state able to transition to Failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Loading,
    Analyzing,
    Sorting,
    Writing,
    Done,
    Failed(JobError),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed(_))
    }
}

/// Results sent from the worker thread to the observer.
/// After a `Failed` event nothing further is emitted for that job.
#[derive(Clone, Debug)]
pub enum JobEvent {
    PhaseChange { job_id: Uuid, state: JobState },
    Progress    { job_id: Uuid, phase: Phase, frame: u64, total: u64, line: String },
    Done        { job_id: Uuid, output: PathBuf },
    Failed      { job_id: Uuid, phase: Phase, error: JobError },
}

/// CLI exit code for a failed job. Codec errors map by phase: the same
/// `DecodeFailed` is a 3 during analysis and a 4 during the write pass
/// (pass 2 re-reads source frames, so decode errors can happen there too).
pub fn exit_code(error: &JobError, phase: Phase) -> u8 {
    match error {
        JobError::Cancelled => 5,
        JobError::NotFound(_)
        | JobError::Unreadable(_)
        | JobError::UnsupportedFormat(_)
        | JobError::CorruptOffsets { .. } => 2,
        JobError::Unwritable(_)
        | JobError::CodecUnavailable(_)
        | JobError::EncodeFailed(_) => 4,
        JobError::EmptySurface | JobError::DecodeFailed(_) => {
            if phase == Phase::Writing { 4 } else { 3 }
        }
        JobError::Busy => 1,
    }
}
