// crates/luminorder-core/src/record.rs
//
// FrameRecord table and the rounded-bucket comparator.
//
// A raw brightness sort is noisy: consecutive frames often differ in the
// sixth decimal from codec artefacts, so the output flickers between
// near-identical frames pulled from distant parts of the source. Rounding
// brightness to a bucket (default 0.01) groups perceptually indistinguishable
// frames, and the source-index tie-break keeps original runs intact inside
// each bucket.

use std::cmp::Ordering;

/// One analyzed frame: where it came from and how bright it is.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameRecord {
    /// Frame index in the source movie.
    pub index:      u64,
    /// Mean pixel intensity in [0, 1].
    pub brightness: f64,
}

/// Round `brightness` to the nearest multiple of `round_to`.
/// `round_to <= 0.0` disables bucketing and the raw value is compared.
pub fn bucket(brightness: f64, round_to: f64) -> f64 {
    if round_to <= 0.0 {
        brightness
    } else {
        (brightness / round_to).round() * round_to
    }
}

/// Bucket order first, then ascending source index. `reverse` flips the
/// bucket order only — the index tie-break stays ascending so in-order runs
/// from the source survive in both directions.
pub fn compare(a: &FrameRecord, b: &FrameRecord, round_to: f64, reverse: bool) -> Ordering {
    let qa = bucket(a.brightness, round_to);
    let qb = bucket(b.brightness, round_to);
    // Brightness is finite by construction; treat a NaN pair as equal.
    let by_bucket = qa.partial_cmp(&qb).unwrap_or(Ordering::Equal);
    let by_bucket = if reverse { by_bucket.reverse() } else { by_bucket };
    by_bucket.then_with(|| a.index.cmp(&b.index))
}

/// Stable sort of the frame table under the bucket comparator.
pub fn sort_table(table: &mut [FrameRecord], round_to: f64, reverse: bool) {
    table.sort_by(|a, b| compare(a, b, round_to, reverse));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(index: u64, brightness: f64) -> FrameRecord {
        FrameRecord { index, brightness }
    }

    fn order(table: &[FrameRecord]) -> Vec<u64> {
        table.iter().map(|r| r.index).collect()
    }

    #[test]
    fn three_uniform_frames_sort_by_bucket() {
        // black, white, mid-gray → buckets 0.00, 1.00, 0.50
        let mut t = vec![rec(0, 0.0), rec(1, 1.0), rec(2, 128.0 * 3.0 / 765.0)];
        sort_table(&mut t, 0.01, false);
        assert_eq!(order(&t), vec![0, 2, 1]);
    }

    #[test]
    fn equal_buckets_tie_break_on_source_index() {
        // all four round to 0.50 at ε = 0.01
        let mut t = vec![rec(0, 0.501), rec(1, 0.504), rec(2, 0.496), rec(3, 0.498)];
        sort_table(&mut t, 0.01, false);
        assert_eq!(order(&t), vec![0, 1, 2, 3]);
    }

    #[test]
    fn distinct_buckets_dominate_index() {
        let mut t = vec![rec(0, 0.49), rec(1, 0.51), rec(2, 0.48), rec(3, 0.52)];
        sort_table(&mut t, 0.01, false);
        assert_eq!(order(&t), vec![2, 0, 1, 3]);
    }

    #[test]
    fn reverse_flips_buckets_but_not_ties() {
        let mut t = vec![rec(0, 0.49), rec(1, 0.51), rec(2, 0.512), rec(3, 0.52)];
        sort_table(&mut t, 0.01, true);
        // 0.52 first, then the 0.51 bucket in source order, then 0.49
        assert_eq!(order(&t), vec![3, 1, 2, 0]);
    }

    #[test]
    fn zero_round_to_compares_raw_values() {
        let mut t = vec![rec(0, 0.501), rec(1, 0.509), rec(2, 0.495), rec(3, 0.505)];
        sort_table(&mut t, 0.0, false);
        assert_eq!(order(&t), vec![2, 0, 3, 1]);
    }

    #[test]
    fn sorted_output_is_monotone_in_bucket() {
        let mut t: Vec<FrameRecord> = (0..100)
            .map(|i| rec(i, ((i * 37) % 100) as f64 / 100.0))
            .collect();
        sort_table(&mut t, 0.01, false);
        for pair in t.windows(2) {
            let qa = bucket(pair[0].brightness, 0.01);
            let qb = bucket(pair[1].brightness, 0.01);
            assert!(qa <= qb);
            if qa == qb {
                assert!(pair[0].index < pair[1].index);
            }
        }
    }
}
