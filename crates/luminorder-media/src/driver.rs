// crates/luminorder-media/src/driver.rs
//
// The two-pass pipeline: analyze every frame's brightness, sort the table
// under the bucket comparator, persist the sidecar, then re-read frames in
// sorted order into the sink. Blocking — runs on the JobController's worker
// thread.
//
// Failure ordering is what makes the artifacts diagnosable:
//   pass-1 failure  → table discarded, neither sidecar nor output written
//   sort failure    → sidecar may be partial, no output
//   pass-2 failure  → sidecar complete, partial output left on disk
// Cancellation is checked between frames and between phases; worst-case
// latency is one frame.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crossbeam_channel::Sender;
use uuid::Uuid;

use luminorder_core::progress::{self, Metric};
use luminorder_core::{
    offsets, sort_table, FrameRecord, JobConfig, JobError, JobEvent, JobState, Phase,
};

use crate::analyze::brightness;
use crate::sink::MovieSink;
use crate::source::MovieSource;
use crate::worker::StatusSlot;

/// Emit a progress event every this many frames (both passes).
const PROGRESS_INTERVAL: u64 = 50;

/// Per-job plumbing shared by every phase: the cancel flag the worker polls,
/// the event channel, and the status slot observers read.
pub(crate) struct JobCtx<'a> {
    pub job_id: Uuid,
    pub cancel: &'a AtomicBool,
    pub tx:     &'a Sender<JobEvent>,
    pub status: &'a StatusSlot,
}

impl JobCtx<'_> {
    pub(crate) fn set_phase(&self, state: JobState) {
        {
            let mut st = self.status.lock().unwrap();
            st.state = state.clone();
        }
        let _ = self.tx.send(JobEvent::PhaseChange { job_id: self.job_id, state });
    }

    pub(crate) fn fail(&self, error: JobError, phase: Phase) {
        {
            let mut st = self.status.lock().unwrap();
            st.state = JobState::Failed(error.clone());
            st.line = error.to_string();
        }
        let _ = self.tx.send(JobEvent::Failed { job_id: self.job_id, error, phase });
    }

    fn progress(&self, phase: Phase, frame: u64, total: u64, line: String) {
        {
            let mut st = self.status.lock().unwrap();
            st.line = line.clone();
        }
        // Progress is droppable: observers that fall behind (or don't exist)
        // can always catch up from the status slot.
        let _ = self.tx.try_send(JobEvent::Progress {
            job_id: self.job_id,
            phase,
            frame,
            total,
            line,
        });
    }

    fn check_cancel(&self) -> Result<(), JobError> {
        if self.cancel.load(Ordering::Relaxed) {
            Err(JobError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Run one complete job. Returns the output path, or the error plus the
/// phase it happened in (the phase picks the exit code for codec errors).
pub(crate) fn run_job(
    input: &Path,
    cfg: &JobConfig,
    ctx: &JobCtx,
) -> Result<PathBuf, (JobError, Phase)> {
    // ── Open ─────────────────────────────────────────────────────────────────
    ctx.set_phase(JobState::Loading);
    let mut source = MovieSource::open(input).map_err(|e| (e, Phase::Loading))?;

    let n = source.frame_count();
    let end = match cfg.max_duration {
        Some(secs) if secs > 0.0 => {
            n.min(cfg.start_frame + (secs * source.framerate_hz()).ceil() as u64)
        }
        _ => n,
    };
    let start = cfg.start_frame.min(end);
    let offsets_path = cfg.offsets_path(input);

    eprintln!(
        "[job] {} — {} frames, {}x{} @ {:.3} fps",
        input.display(),
        n,
        source.width(),
        source.height(),
        source.framerate_hz()
    );

    // ── Pass 1: analyze (or resume from the sidecar) ─────────────────────────
    let mut table = if cfg.resume && offsets_path.exists() {
        eprintln!("[job] resuming from {}", offsets_path.display());
        offsets::read_offsets(&offsets_path).map_err(|e| (e, Phase::Loading))?
    } else {
        analyze_pass(&mut source, start, end, ctx).map_err(|e| (e, Phase::Analyzing))?
    };

    // ── Sort + persist ───────────────────────────────────────────────────────
    ctx.set_phase(JobState::Sorting);
    ctx.check_cancel().map_err(|e| (e, Phase::Sorting))?;
    sort_table(&mut table, cfg.round_to, cfg.reverse);
    offsets::write_offsets(&offsets_path, &table).map_err(|e| {
        (
            JobError::Unwritable(format!("{}: {e}", offsets_path.display())),
            Phase::Sorting,
        )
    })?;

    // ── Pass 2: write ────────────────────────────────────────────────────────
    ctx.set_phase(JobState::Writing);
    let output = cfg.output_path(input);
    write_pass(&mut source, &table, &output, ctx).map_err(|e| (e, Phase::Writing))?;

    Ok(output)
}

/// Sequential decode of frames `[start, end)`, reducing each to a
/// `FrameRecord`. Any decoder failure aborts and the caller discards the
/// partial table.
fn analyze_pass(
    source: &mut MovieSource,
    start: u64,
    end: u64,
    ctx: &JobCtx,
) -> Result<Vec<FrameRecord>, JobError> {
    ctx.set_phase(JobState::Analyzing);

    let total = end - start;
    let mut table = Vec::with_capacity(total as usize);
    let t0 = Instant::now();

    for i in start..end {
        ctx.check_cancel()?;
        let surface = source.read_frame(i)?;
        let b = brightness(surface)?;
        table.push(FrameRecord { index: i, brightness: b });

        let done = i - start + 1;
        if (done - 1) % PROGRESS_INTERVAL == 0 || done == total {
            let line = progress::format_progress(
                Phase::Analyzing,
                done,
                total,
                Metric::Brightness(b),
                t0.elapsed().as_secs_f64(),
            );
            ctx.progress(Phase::Analyzing, done, total, line);
        }
    }
    Ok(table)
}

/// Random-access re-read of the sorted table into a fresh sink.
fn write_pass(
    source: &mut MovieSource,
    table: &[FrameRecord],
    output: &Path,
    ctx: &JobCtx,
) -> Result<(), JobError> {
    let mut sink = MovieSink::open(output, source.width(), source.height(), source.frame_rate())?;

    let total = table.len() as u64;
    let t0 = Instant::now();

    for (k, rec) in table.iter().enumerate() {
        // Cancellation here leaves the partial output and the complete
        // sidecar on disk — both are useful for diagnosis.
        ctx.check_cancel()?;

        let surface = source.read_frame(rec.index)?;
        sink.append(surface)?;

        let done = k as u64 + 1;
        if k as u64 % PROGRESS_INTERVAL == 0 || done == total {
            let line = progress::format_progress(
                Phase::Writing,
                done,
                total,
                Metric::SourceFrame { index: rec.index, brightness: rec.brightness },
                t0.elapsed().as_secs_f64(),
            );
            ctx.progress(Phase::Writing, done, total, line);
        }
    }

    sink.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crossbeam_channel::bounded;

    use crate::testutil::{write_fixture_clip, FIXTURE_HEIGHT, FIXTURE_WIDTH};
    use crate::worker::JobStatus;

    /// Drive one job synchronously, with the cancel flag optionally raised
    /// before the first frame.
    fn run(input: &Path, cfg: &JobConfig, pre_cancel: bool) -> Result<PathBuf, (JobError, Phase)> {
        let (tx, _rx) = bounded(512);
        let status = Arc::new(Mutex::new(JobStatus {
            state: JobState::Idle,
            line:  String::new(),
        }));
        let cancel = AtomicBool::new(pre_cancel);
        let ctx = JobCtx { job_id: Uuid::new_v4(), cancel: &cancel, tx: &tx, status: &status };
        run_job(input, cfg, &ctx)
    }

    #[test]
    fn start_offset_limits_artifacts_to_the_tail() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.mov");
        write_fixture_clip(&input, &[0, 20, 40, 60, 80, 100, 120, 140, 160, 180]);

        let cfg = JobConfig { start_frame: 5, ..JobConfig::default() };
        let output = run(&input, &cfg, false).expect("job should succeed");

        // Only the skipped range's tail appears in the sidecar…
        let table = offsets::read_offsets(&cfg.offsets_path(&input)).unwrap();
        let mut indices: Vec<u64> = table.iter().map(|r| r.index).collect();
        indices.sort_unstable();
        assert_eq!(indices, vec![5, 6, 7, 8, 9]);

        // …and the output holds exactly those five frames at source geometry.
        let readback = MovieSource::open(&output).unwrap();
        assert_eq!(readback.frame_count(), 5);
        assert_eq!((readback.width(), readback.height()), (FIXTURE_WIDTH, FIXTURE_HEIGHT));
    }

    #[test]
    fn sidecar_is_sorted_darkest_first() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.mov");
        // white, black, mid-gray
        write_fixture_clip(&input, &[255, 0, 128]);

        let cfg = JobConfig::default();
        run(&input, &cfg, false).expect("job should succeed");

        let table = offsets::read_offsets(&cfg.offsets_path(&input)).unwrap();
        let order: Vec<u64> = table.iter().map(|r| r.index).collect();
        assert_eq!(order, vec![1, 2, 0]);
        for pair in table.windows(2) {
            assert!(pair[0].brightness <= pair[1].brightness);
        }
    }

    #[test]
    fn abort_during_analysis_leaves_no_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.mov");
        write_fixture_clip(&input, &[0, 60, 120]);

        let cfg = JobConfig::default();
        let err = run(&input, &cfg, true).unwrap_err();
        assert_eq!(err, (JobError::Cancelled, Phase::Analyzing));

        assert!(!cfg.offsets_path(&input).exists());
        assert!(!cfg.output_path(&input).exists());
    }

    #[test]
    fn write_pass_failure_preserves_the_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.mov");
        write_fixture_clip(&input, &[0, 60, 120, 180]);

        // An output path whose directory does not exist sinks the write pass
        // after the sidecar is already on disk.
        let cfg = JobConfig {
            output_movie: "no-such-dir/output.mov".into(),
            ..JobConfig::default()
        };
        let (error, phase) = run(&input, &cfg, false).unwrap_err();
        assert!(matches!(error, JobError::Unwritable(_)));
        assert_eq!(phase, Phase::Writing);

        let table = offsets::read_offsets(&cfg.offsets_path(&input)).unwrap();
        assert_eq!(table.len(), 4);
        assert!(!cfg.output_path(&input).exists());
    }
}
