// crates/luminorder-core/src/config.rs
//
// Runtime configuration. Defaults mirror the classic constants: start at
// frame 0, bucket width 0.01, sidecar `offsets.txt` and output `output.mov`
// written next to the input file.

use std::path::{Path, PathBuf};

#[derive(Clone, Debug)]
pub struct JobConfig {
    /// Skip this many leading frames of the source.
    pub start_frame:  u64,
    /// Bucket width for the rounded-brightness comparator; <= 0 disables
    /// rounding and raw brightness is compared.
    pub round_to:     f64,
    /// Sidecar filename, placed in the input's directory.
    pub offset_file:  String,
    /// Output movie filename, placed in the input's directory.
    pub output_movie: String,
    /// Darkest-last instead of darkest-first.
    pub reverse:      bool,
    /// Reuse an existing sidecar and skip the analyze pass.
    pub resume:       bool,
    /// Only process this many seconds of the source.
    pub max_duration: Option<f64>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            start_frame:  0,
            round_to:     0.01,
            offset_file:  "offsets.txt".into(),
            output_movie: "output.mov".into(),
            reverse:      false,
            resume:       false,
            max_duration: None,
        }
    }
}

impl JobConfig {
    /// The sidecar lives in the parent directory of the input file.
    pub fn offsets_path(&self, input: &Path) -> PathBuf {
        sibling(input, &self.offset_file)
    }

    /// The output movie lives next to the input too.
    pub fn output_path(&self, input: &Path) -> PathBuf {
        sibling(input, &self.output_movie)
    }
}

fn sibling(input: &Path, name: &str) -> PathBuf {
    input.parent().unwrap_or_else(|| Path::new(".")).join(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifacts_land_next_to_the_input() {
        let cfg = JobConfig::default();
        let input = Path::new("/clips/tower.mov");
        assert_eq!(cfg.offsets_path(input), PathBuf::from("/clips/offsets.txt"));
        assert_eq!(cfg.output_path(input), PathBuf::from("/clips/output.mov"));
    }

    #[test]
    fn bare_filename_stays_relative() {
        let cfg = JobConfig::default();
        let input = Path::new("tower.mov");
        assert_eq!(cfg.output_path(input), PathBuf::from("output.mov"));
    }
}
