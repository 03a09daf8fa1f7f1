//! Assertion utilities for testing.
//!
//! Output columns hold optional values, so these helpers compare
//! `Option<f64>` sequences with a tolerance on the present values.

/// Default epsilon for floating-point comparisons
pub const DEFAULT_EPSILON: f64 = 1e-9;

/// Assert that two optional-value columns agree element-wise.
///
/// # Panics
///
/// Panics if the lengths differ, if a null appears on only one side, or if
/// two present values differ by more than `epsilon` (default: 1e-9).
pub fn assert_column_approx_eq(actual: &[Option<f64>], expected: &[Option<f64>], epsilon: Option<f64>) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "Columns have different lengths: actual = {}, expected = {}",
        actual.len(),
        expected.len()
    );

    let eps = epsilon.unwrap_or(DEFAULT_EPSILON);
    for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        match (a, e) {
            (Some(a), Some(e)) => assert!(
                (a - e).abs() <= eps,
                "Columns differ at row {}: actual = {}, expected = {}, epsilon = {}",
                i,
                a,
                e,
                eps
            ),
            (None, None) => {}
            _ => panic!(
                "Null mismatch at row {}: actual = {:?}, expected = {:?}",
                i, a, e
            ),
        }
    }
}

/// Assert that a column has no nulls.
pub fn assert_no_nulls(name: &str, values: &[Option<f64>]) {
    if let Some(row) = values.iter().position(Option::is_none) {
        panic!("Column {} has a null at row {}", name, row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_column_approx_eq() {
        assert_column_approx_eq(&[Some(1.0), None], &[Some(1.0 + 1e-12), None], None);
        assert_column_approx_eq(&[Some(1.0)], &[Some(1.001)], Some(0.01));
    }

    #[test]
    #[should_panic]
    fn test_null_mismatch_panics() {
        assert_column_approx_eq(&[Some(1.0)], &[None], None);
    }
}
