// crates/luminorder-media/src/lib.rs
//
// No CLI or GUI dependency — observers talk to this crate via channels and
// the shared status slot only.
//
// Module map:
//   surface — the RGB24 pixel buffer handed from source to analyzer and sink
//   source  — demux + decode side of the codec adapter (frame reads by index)
//   sink    — H.264 mux + encode side
//   analyze — per-frame mean-brightness reduction
//   driver  — the two-pass pipeline (analyze → sort → write)
//   worker  — JobController: background job thread, cancellation, status

pub mod analyze;
pub mod driver;
pub mod sink;
pub mod source;
pub mod surface;
pub mod worker;

#[cfg(test)]
pub(crate) mod testutil;

pub use surface::Surface;
pub use worker::{JobController, JobStatus};

/// Initialise the FFmpeg libraries. Call once before starting any job.
pub fn init() -> anyhow::Result<()> {
    ffmpeg_the_third::init()?;
    Ok(())
}
