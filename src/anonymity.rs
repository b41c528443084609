use crate::histogram::{bucket_label, Histogram};

// Every equivalence class must hold at least k records; the smallest class
// is the binding constraint.
pub fn check_k_anonymity(histogram: &Histogram, k: u64) -> bool {
    histogram.values().all(|&count| count >= k)
}

/// Size of the smallest equivalence class, if the histogram has any.
pub fn min_class_size(histogram: &Histogram) -> Option<u64> {
    histogram.values().copied().min()
}

/// Replace each quasi-identifier cell of each row with its bucket interval
/// label under the chosen widths; every other cell passes through unchanged.
pub fn generalize_rows(
    rows: &[Vec<String>],
    qi_values: &[Vec<i64>],
    qi_indices: &[usize],
    widths: &[i64],
) -> Vec<Vec<String>> {
    rows.iter()
        .zip(qi_values.iter())
        .map(|(row, values)| {
            let mut generalized = row.clone();
            for ((&column, &value), &width) in
                qi_indices.iter().zip(values.iter()).zip(widths.iter())
            {
                generalized[column] = bucket_label(value, width);
            }
            generalized
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn histogram(counts: &[u64]) -> Histogram {
        counts
            .iter()
            .enumerate()
            .map(|(i, &count)| (vec![format!("[{}-{}]", i * 10, i * 10 + 9)], count))
            .collect()
    }

    #[test]
    fn test_check_k_anonymity_holds_at_minimum() {
        assert!(check_k_anonymity(&histogram(&[5, 7, 12]), 5));
    }

    #[test]
    fn test_check_k_anonymity_fails_below_minimum() {
        assert!(!check_k_anonymity(&histogram(&[4, 7, 12]), 5));
        assert!(!check_k_anonymity(&histogram(&[5, 7, 1]), 5));
    }

    #[test]
    fn test_min_class_size() {
        assert_eq!(min_class_size(&histogram(&[5, 7, 2])), Some(2));
        assert_eq!(min_class_size(&Histogram::new()), None);
    }

    #[test]
    fn test_generalize_rows_replaces_only_quasi_identifiers() {
        let rows = vec![
            vec!["alice".to_string(), "34".to_string(), "x".to_string()],
            vec!["bob".to_string(), "41".to_string(), "y".to_string()],
        ];
        let qi_values = vec![vec![34], vec![41]];
        let generalized = generalize_rows(&rows, &qi_values, &[1], &[10]);
        assert_eq!(
            generalized,
            vec![
                vec!["alice".to_string(), "[30-39]".to_string(), "x".to_string()],
                vec!["bob".to_string(), "[40-49]".to_string(), "y".to_string()],
            ]
        );
    }

    #[test]
    fn test_generalize_rows_label_contains_value() {
        let rows = vec![vec!["57".to_string()]];
        let generalized = generalize_rows(&rows, &[vec![57]], &[0], &[25]);
        assert_eq!(generalized[0][0], "[50-74]");
    }
}
