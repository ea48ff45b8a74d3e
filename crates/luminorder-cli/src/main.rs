// crates/luminorder-cli/src/main.rs
//
// Thin observer over the headless JobController: parse flags, start the job,
// render progress lines, and map the terminal event to an exit code.
//
// Exit codes: 0 success, 2 bad input, 3 codec error during analysis,
// 4 codec error during the write pass, 5 cancelled.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use luminorder_core::{exit_code, JobConfig, JobEvent, JobState};
use luminorder_media::JobController;

#[derive(Parser, Debug)]
#[command(
    name = "luminorder",
    version,
    about = "Reorder a video's frames by ascending mean brightness"
)]
struct Args {
    /// Input video file.
    input: PathBuf,

    /// Output movie filename, written next to the input.
    #[arg(short = 'o', long = "output", default_value = "output.mov")]
    output: String,

    /// Sidecar filename for the sorted (index, brightness) table.
    #[arg(long = "offsets", default_value = "offsets.txt")]
    offsets: String,

    /// Skip this many leading frames of the source.
    #[arg(long = "start-frame", default_value_t = 0)]
    start_frame: u64,

    /// Brightness bucket width for the comparator; 0 disables rounding.
    #[arg(short = 'r', long = "round-to", default_value_t = 0.01)]
    round_to: f64,

    /// Darkest-last instead of darkest-first.
    #[arg(short = 'R', long = "reverse")]
    reverse: bool,

    /// Reuse an existing offsets sidecar and skip the analyze pass.
    #[arg(long = "resume")]
    resume: bool,

    /// Only process this many seconds of the source.
    #[arg(short = 'l', long = "length")]
    length: Option<f64>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = luminorder_media::init() {
        eprintln!("luminorder: FFmpeg init failed: {e}");
        return ExitCode::from(2);
    }

    let cfg = JobConfig {
        start_frame:  args.start_frame,
        round_to:     args.round_to,
        offset_file:  args.offsets,
        output_movie: args.output,
        reverse:      args.reverse,
        resume:       args.resume,
        max_duration: args.length,
    };

    let controller = JobController::new();
    if let Err(e) = controller.start(args.input, cfg) {
        eprintln!("luminorder: {e}");
        return ExitCode::from(2);
    }

    for event in controller.rx.iter() {
        match event {
            JobEvent::PhaseChange { state, .. } => match state {
                JobState::Loading   => println!("Opening file..."),
                JobState::Analyzing => println!("Analyzing brightness..."),
                JobState::Sorting   => println!("Sorting frames..."),
                JobState::Writing   => println!("Saving output..."),
                _ => {}
            },
            JobEvent::Progress { line, .. } => println!("{line}"),
            JobEvent::Done { output, .. } => {
                println!("Export complete: {}", output.display());
                return ExitCode::SUCCESS;
            }
            JobEvent::Failed { error, phase, .. } => {
                eprintln!("luminorder: {error}");
                return ExitCode::from(exit_code(&error, phase));
            }
        }
    }

    // Channel closed without a terminal event — treat as failure.
    ExitCode::from(1)
}
