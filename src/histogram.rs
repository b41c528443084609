use std::collections::HashMap;
use std::fmt::Write;

use indicatif::{ProgressBar, ProgressState, ProgressStyle};
use num::Integer;
use rayon::prelude::*;

use crate::anonymity::check_k_anonymity;
use crate::error::OlaError;
use crate::lattice::RiVector;

/// Equivalence class counts, keyed by one interval label per
/// quasi-identifier. Keys from disjoint record sets merge by summation.
pub type Histogram = HashMap<Vec<String>, u64>;

/// Lower bound of the bucket containing `value` at the given width.
/// Floor division keeps negative values in the right bucket.
pub fn bucket_low(value: i64, width: i64) -> i64 {
    Integer::div_floor(&value, &width) * width
}

/// Interval label `"[low-high]"` for the bucket containing `value`.
pub fn bucket_label(value: i64, width: i64) -> String {
    let low = bucket_low(value, width);
    format!("[{}-{}]", low, low + width - 1)
}

// Recover the numeric lower bound from a bucket key: an interval label, or a
// bare integer as produced by earlier coarsening passes. The leading '-' of
// a negative lower bound is part of the number, not the separator.
fn parse_bucket_low(key: &str) -> Result<i64, OlaError> {
    let unparsable = || OlaError::UnparsableBucketKey {
        key: key.to_string(),
    };
    match key.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
        Some(inner) => {
            let split = inner
                .get(1..)
                .and_then(|tail| tail.find('-'))
                .map(|pos| pos + 1)
                .ok_or_else(unparsable)?;
            inner[..split].parse::<i64>().map_err(|_| unparsable())
        }
        None => key.parse::<i64>().map_err(|_| unparsable()),
    }
}

/// Bucket every record of one chunk into its equivalence class.
pub fn process_chunk(chunk: &[Vec<i64>], widths: &[i64]) -> Histogram {
    let mut histogram = Histogram::new();
    for record in chunk {
        let key: Vec<String> = record
            .iter()
            .zip(widths.iter())
            .map(|(&value, &width)| bucket_label(value, width))
            .collect();
        *histogram.entry(key).or_default() += 1;
    }
    histogram
}

/// Merge two partial histograms by keyed summation. Associative and
/// commutative, so chunk boundaries and merge order never affect the result.
pub fn merge_histograms(mut left: Histogram, right: Histogram) -> Histogram {
    for (key, count) in right {
        *left.entry(key).or_default() += count;
    }
    left
}

/// Exact equivalence-class histogram of the whole dataset under the given
/// widths. Each chunk is bucketed independently, so chunks run in parallel
/// and the reduction is the only point where results meet.
pub fn build_histogram(records: &[Vec<i64>], widths: &[i64], chunk_size: usize) -> Histogram {
    let n_chunks = records.len().div_ceil(chunk_size) as u64;
    let progress = ProgressBar::new(n_chunks);
    progress.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos:>7}/{len:7} ({eta})",
        )
        .unwrap()
        .with_key("eta", |state: &ProgressState, w: &mut dyn Write| {
            write!(w, "{:.1}s", state.eta().as_secs_f64()).unwrap()
        })
        .progress_chars("#>-"),
    );
    let histogram = records
        .par_chunks(chunk_size)
        .map(|chunk| {
            let local = process_chunk(chunk, widths);
            progress.inc(1);
            local
        })
        .reduce(Histogram::new, merge_histograms);
    progress.finish_and_clear();
    histogram
}

/// Re-bucket an existing histogram under new widths without touching raw
/// records: each bucket's lower bound stands in for every record it holds.
/// This is exact only when every new width is an integer multiple of the old
/// one; otherwise records near bucket edges can be misattributed. Inherited
/// approximation, kept as-is.
pub fn simulate_histogram(histogram: &Histogram, widths: &[i64]) -> Result<Histogram, OlaError> {
    let mut simulated = Histogram::new();
    for (key, &count) in histogram {
        let new_key = key
            .iter()
            .zip(widths.iter())
            .map(|(label, &width)| Ok(bucket_label(parse_bucket_low(label)?, width)))
            .collect::<Result<Vec<String>, OlaError>>()?;
        *simulated.entry(new_key).or_default() += count;
    }
    Ok(simulated)
}

/// Second search phase, run when the candidate widths pass the class cap but
/// fail the real k-anonymity check. Grows the candidate vector with the same
/// growth-factor and per-coordinate cap rule as the lattice, validating each
/// new vector against a simulated histogram. The first vector in expansion
/// order that validates wins.
pub fn rerun_with_histogram(
    initial_ri: &[i64],
    histogram: &Histogram,
    k: u64,
    range_sizes: &[i64],
    growth_factor: i64,
) -> Result<RiVector, OlaError> {
    let mut frontier = vec![initial_ri.to_vec()];
    loop {
        let mut next_frontier: Vec<RiVector> = Vec::new();
        for node in &frontier {
            for (i, &cap) in range_sizes.iter().enumerate() {
                if node[i] >= cap {
                    continue;
                }
                let mut grown = node.clone();
                grown[i] = (grown[i] * growth_factor).min(cap);
                if next_frontier.contains(&grown) {
                    continue;
                }
                let simulated = simulate_histogram(histogram, &grown)?;
                if check_k_anonymity(&simulated, k) {
                    return Ok(grown);
                }
                next_frontier.push(grown);
            }
        }
        if next_frontier.is_empty() {
            return Err(OlaError::InfeasibleKAnonymity { k });
        }
        frontier = next_frontier;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anonymity::min_class_size;

    fn records(values: &[i64]) -> Vec<Vec<i64>> {
        values.iter().map(|&v| vec![v]).collect()
    }

    #[test]
    fn test_bucket_label() {
        assert_eq!(bucket_label(23, 5), "[20-24]");
        assert_eq!(bucket_label(20, 5), "[20-24]");
        assert_eq!(bucket_label(0, 10), "[0-9]");
    }

    #[test]
    fn test_bucket_label_negative_value() {
        assert_eq!(bucket_label(-7, 5), "[-10--6]");
        assert_eq!(bucket_low(-7, 5), -10);
    }

    #[test]
    fn test_parse_bucket_low_round_trip() {
        for value in [-23, -1, 0, 7, 104] {
            for width in [1, 3, 5, 10] {
                let low = bucket_low(value, width);
                assert_eq!(parse_bucket_low(&bucket_label(value, width)), Ok(low));
                assert!(low <= value && value <= low + width - 1);
            }
        }
    }

    #[test]
    fn test_parse_bucket_low_bare_number() {
        assert_eq!(parse_bucket_low("40"), Ok(40));
        assert_eq!(parse_bucket_low("-15"), Ok(-15));
    }

    #[test]
    fn test_parse_bucket_low_rejects_garbage() {
        for key in ["", "[]", "[20]", "abc", "[a-b]"] {
            assert_eq!(
                parse_bucket_low(key),
                Err(OlaError::UnparsableBucketKey {
                    key: key.to_string()
                })
            );
        }
    }

    #[test]
    fn test_process_chunk_counts_classes() {
        let histogram = process_chunk(&records(&[1, 3, 7, 12]), &[5]);
        assert_eq!(histogram.len(), 3);
        assert_eq!(histogram[&vec!["[0-4]".to_string()]], 2);
        assert_eq!(histogram[&vec!["[5-9]".to_string()]], 1);
        assert_eq!(histogram[&vec!["[10-14]".to_string()]], 1);
    }

    #[test]
    fn test_merge_sums_equal_keys() {
        // Two chunks with identical bucket assignments under width 5 add up
        // exactly as if processed as one.
        let chunk_a = records(&[1, 2, 6]);
        let chunk_b = records(&[3, 4, 8]);
        let both: Vec<Vec<i64>> = chunk_a.iter().chain(chunk_b.iter()).cloned().collect();
        let merged = merge_histograms(
            process_chunk(&chunk_a, &[5]),
            process_chunk(&chunk_b, &[5]),
        );
        assert_eq!(merged, process_chunk(&both, &[5]));
        assert_eq!(merged[&vec!["[0-4]".to_string()]], 4);
        assert_eq!(merged[&vec!["[5-9]".to_string()]], 2);
    }

    #[test]
    fn test_build_histogram_independent_of_chunk_size() {
        let data = records(&[1, 5, 9, 14, 14, 20, 21, 3, 3, 3]);
        let widths = vec![5];
        let whole = build_histogram(&data, &widths, data.len());
        for chunk_size in [1, 2, 3, 7] {
            assert_eq!(build_histogram(&data, &widths, chunk_size), whole);
        }
    }

    #[test]
    fn test_simulate_histogram_merges_buckets() {
        let histogram = process_chunk(&records(&[1, 3, 7, 12]), &[5]);
        let simulated = simulate_histogram(&histogram, &[10]).unwrap();
        assert_eq!(simulated.len(), 2);
        assert_eq!(simulated[&vec!["[0-9]".to_string()]], 3);
        assert_eq!(simulated[&vec!["[10-19]".to_string()]], 1);
    }

    #[test]
    fn test_simulate_histogram_rejects_malformed_key() {
        let mut histogram = Histogram::new();
        histogram.insert(vec!["not a bucket".to_string()], 3);
        assert_eq!(
            simulate_histogram(&histogram, &[4]),
            Err(OlaError::UnparsableBucketKey {
                key: "not a bucket".to_string()
            })
        );
    }

    #[test]
    fn test_rerun_coarsens_until_k_anonymous() {
        // Width 2 over 0..=9 leaves a singleton class per bucket; only the
        // full-range width 10 gathers all five records into one class.
        let histogram = process_chunk(&records(&[0, 2, 4, 6, 8]), &vec![2]);
        assert!(!check_k_anonymity(&histogram, 5));
        let result = rerun_with_histogram(&[2], &histogram, 5, &[10], 2).unwrap();
        assert_eq!(result, vec![10]);
        let simulated = simulate_histogram(&histogram, &result).unwrap();
        assert!(min_class_size(&simulated).unwrap() >= 5);
    }

    #[test]
    fn test_rerun_reports_infeasible_k() {
        let histogram = process_chunk(&records(&[0, 2, 4, 6, 8]), &vec![2]);
        assert_eq!(
            rerun_with_histogram(&[2], &histogram, 6, &[10], 2),
            Err(OlaError::InfeasibleKAnonymity { k: 6 })
        );
    }
}
