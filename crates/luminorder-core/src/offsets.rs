// crates/luminorder-core/src/offsets.rs
//
// The offsets sidecar: one `<source_index>,<brightness>` line per record,
// in table (post-sort) order, LF-terminated. Six fractional digits — enough
// to round-trip any brightness the comparator can distinguish, and always
// `.`-separated regardless of locale (Rust's float formatting is
// locale-independent).

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::job::JobError;
use crate::record::FrameRecord;

/// Write one line per record, in the table's current order.
pub fn write_offsets(path: &Path, table: &[FrameRecord]) -> io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    for rec in table {
        writeln!(w, "{},{:.6}", rec.index, rec.brightness)?;
    }
    w.flush()
}

/// Parse a sidecar written by `write_offsets`. Used by the resume path;
/// any malformed line is `CorruptOffsets` with its 1-based line number.
pub fn read_offsets(path: &Path) -> Result<Vec<FrameRecord>, JobError> {
    let file = File::open(path)
        .map_err(|e| JobError::Unreadable(format!("{}: {e}", path.display())))?;

    let mut table = Vec::new();
    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| JobError::Unreadable(format!("{}: {e}", path.display())))?;
        if line.is_empty() {
            continue; // tolerate a trailing blank line
        }
        let rec = parse_line(&line).ok_or(JobError::CorruptOffsets { line: n + 1 })?;
        table.push(rec);
    }
    Ok(table)
}

fn parse_line(line: &str) -> Option<FrameRecord> {
    let (idx, bright) = line.split_once(',')?;
    let index = idx.trim().parse::<u64>().ok()?;
    let brightness = bright.trim().parse::<f64>().ok()?;
    if !brightness.is_finite() || !(0.0..=1.0).contains(&brightness) {
        return None;
    }
    Some(FrameRecord { index, brightness })
}
