// crates/luminorder-core/src/progress.rs
//
// Human-readable progress lines with a linear ETA. Pure formatting — the
// driver owns the clock and passes elapsed seconds in.

use crate::job::Phase;

/// The phase-specific value shown inside the parentheses.
#[derive(Clone, Copy, Debug)]
pub enum Metric {
    /// Analyze pass: the brightness just computed.
    Brightness(f64),
    /// Write pass: which source frame is being copied, and its brightness.
    SourceFrame { index: u64, brightness: f64 },
}

/// Linear prediction of remaining seconds: `elapsed · (1 − r) / r` for
/// completion ratio `r = done / total`. `+∞` when nothing is done yet.
pub fn predict_remaining(elapsed: f64, done: u64, total: u64) -> f64 {
    if done == 0 {
        return f64::INFINITY;
    }
    let ratio = done as f64 / total.max(1) as f64;
    elapsed * (1.0 - ratio) / ratio
}

/// `3m07.12s`. Non-finite predictions (nothing done yet) render as
/// `--m--.--s`.
pub fn format_remaining(secs: f64) -> String {
    if !secs.is_finite() {
        return "--m--.--s".into();
    }
    let minutes = (secs / 60.0) as u64;
    format!("{minutes}m{:05.2}s", secs - 60.0 * minutes as f64)
}

/// One progress line: phase tag, position, metric, elapsed, remaining.
pub fn format_progress(phase: Phase, done: u64, total: u64, metric: Metric, elapsed: f64) -> String {
    let remaining = format_remaining(predict_remaining(elapsed, done, total));
    let metric = match metric {
        Metric::Brightness(b) => format!("brightness {b:.8}"),
        Metric::SourceFrame { index, brightness } => {
            format!("index {index}, brightness {brightness:.8}")
        }
    };
    format!(
        "{}: frame {done}/{total} ({metric}, elapsed {elapsed:.2}s, remaining {remaining})",
        phase.tag()
    )
}
