// crates/luminorder-media/src/worker.rs
//
// JobController: owns the single background job, its cancel flag, and the
// shared (state, latest progress line) slot observers poll. Only one job may
// run at a time; start() on a busy controller fails with JobError::Busy.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};
use uuid::Uuid;

use luminorder_core::{JobConfig, JobError, JobEvent, JobState};

use crate::driver::{run_job, JobCtx};

/// Snapshot observers read: current state plus the latest progress line.
#[derive(Clone, Debug)]
pub struct JobStatus {
    pub state: JobState,
    pub line:  String,
}

pub(crate) type StatusSlot = Arc<Mutex<JobStatus>>;

pub struct JobController {
    /// Events from the worker: phase changes, progress, done, failed.
    pub rx: Receiver<JobEvent>,
    tx:     Sender<JobEvent>,
    status: StatusSlot,
    cancel: Arc<AtomicBool>,
    active: Arc<AtomicBool>,
}

impl JobController {
    pub fn new() -> Self {
        let (tx, rx) = bounded(512);
        Self {
            rx,
            tx,
            status: Arc::new(Mutex::new(JobStatus {
                state: JobState::Idle,
                line:  String::new(),
            })),
            cancel: Arc::new(AtomicBool::new(false)),
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Latest state + progress line. The lock is held only for the clone.
    pub fn status(&self) -> JobStatus {
        self.status.lock().unwrap().clone()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Run `input` on a background worker. Fails with `Busy` while a job is
    /// already running. Returns the job id stamped on every event.
    pub fn start(&self, input: PathBuf, cfg: JobConfig) -> Result<Uuid, JobError> {
        if self.active.swap(true, Ordering::SeqCst) {
            return Err(JobError::Busy);
        }
        self.cancel.store(false, Ordering::SeqCst);

        let job_id = Uuid::new_v4();
        let tx = self.tx.clone();
        let status = Arc::clone(&self.status);
        let cancel = Arc::clone(&self.cancel);
        let active = Arc::clone(&self.active);

        thread::spawn(move || {
            let ctx = JobCtx { job_id, cancel: &cancel, tx: &tx, status: &status };
            match run_job(&input, &cfg, &ctx) {
                Ok(output) => {
                    {
                        let mut st = status.lock().unwrap();
                        st.state = JobState::Done;
                        st.line = format!("Export complete: {}", output.display());
                    }
                    let _ = tx.send(JobEvent::PhaseChange { job_id, state: JobState::Done });
                    let _ = tx.send(JobEvent::Done { job_id, output });
                }
                Err((error, phase)) => {
                    // After this, nothing further is emitted for the job.
                    ctx.fail(error, phase);
                }
            }
            active.store(false, Ordering::SeqCst);
        });

        Ok(job_id)
    }

    /// Cooperative cancellation; the worker polls between frames and phases,
    /// so worst-case latency is one frame.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }
}

impl Default for JobController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use luminorder_core::Phase;

    /// Drain events until the job's terminal event arrives.
    fn run_to_terminal(controller: &JobController, job_id: Uuid) -> JobEvent {
        for event in controller.rx.iter() {
            match &event {
                JobEvent::Done { job_id: id, .. } | JobEvent::Failed { job_id: id, .. }
                    if *id == job_id =>
                {
                    return event;
                }
                _ => {}
            }
        }
        panic!("worker hung up without a terminal event");
    }

    #[test]
    fn missing_input_fails_with_not_found_during_loading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.mov");

        let controller = JobController::new();
        let job_id = controller.start(path.clone(), JobConfig::default()).unwrap();

        match run_to_terminal(&controller, job_id) {
            JobEvent::Failed { error, phase, .. } => {
                assert_eq!(error, JobError::NotFound(path));
                assert_eq!(phase, Phase::Loading);
            }
            other => panic!("expected Failed, got {other:?}"),
        }

        // Status mirrors the failure, and no artifacts were produced.
        assert!(matches!(controller.status().state, JobState::Failed(JobError::NotFound(_))));
        assert!(!dir.path().join("offsets.txt").exists());
        assert!(!dir.path().join("output.mov").exists());
    }

    #[test]
    fn cancel_during_write_keeps_sidecar_and_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.mov");
        let levels: Vec<u8> = (0..240u32).map(|i| i as u8).collect();
        crate::testutil::write_fixture_clip(&input, &levels);

        let cfg = JobConfig::default();
        let controller = JobController::new();
        let job_id = controller.start(input.clone(), cfg.clone()).unwrap();

        // Cancel as soon as the write pass begins; the worker observes the
        // flag at the next frame boundary.
        let terminal = loop {
            match controller.rx.recv().expect("worker hung up") {
                JobEvent::PhaseChange { state: JobState::Writing, .. } => controller.cancel(),
                event @ (JobEvent::Done { .. } | JobEvent::Failed { .. }) => break event,
                _ => {}
            }
        };

        match terminal {
            JobEvent::Failed { job_id: id, error, phase } => {
                assert_eq!(id, job_id);
                assert_eq!(error, JobError::Cancelled);
                assert_eq!(phase, Phase::Writing);
            }
            other => panic!("expected cancellation, got {other:?}"),
        }

        // The complete sidecar survives and the partial output stays on disk.
        let table = luminorder_core::offsets::read_offsets(&cfg.offsets_path(&input)).unwrap();
        assert_eq!(table.len(), 240);
        assert!(cfg.output_path(&input).exists());
    }

    #[test]
    fn controller_frees_up_after_a_failed_job() {
        let dir = tempfile::tempdir().unwrap();
        let controller = JobController::new();

        let first = controller
            .start(dir.path().join("a.mov"), JobConfig::default())
            .unwrap();
        run_to_terminal(&controller, first);

        // The worker flips `active` off after the terminal event; give the
        // scheduler a moment before asserting the next start succeeds.
        for _ in 0..100 {
            if !controller.is_active() {
                break;
            }
            thread::sleep(std::time::Duration::from_millis(5));
        }

        let second = controller.start(dir.path().join("b.mov"), JobConfig::default());
        assert!(second.is_ok());
        run_to_terminal(&controller, second.unwrap());
    }
}
