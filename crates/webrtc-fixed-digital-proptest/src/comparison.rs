//! Assertions over processed FloatS16 frames.

use std::fmt;

use crate::generators::{FLOAT_S16_MAX, FLOAT_S16_MIN};

/// Worst deviation found while comparing a buffer against a scaled reference.
#[derive(Debug)]
pub struct ScaledComparison {
    pub max_abs_diff: f32,
    pub max_abs_diff_index: usize,
    pub mismatches: usize,
    pub total: usize,
}

impl fmt::Display for ScaledComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "max_abs_diff={} (at index {}), mismatches={}/{}",
            self.max_abs_diff, self.max_abs_diff_index, self.mismatches, self.total,
        )
    }
}

/// Compares `actual` with `scale * reference`, element by element.
///
/// The tolerance of each element is `max(abs_tol, |scale * reference| * rel_tol)`.
pub fn compare_scaled(
    actual: &[f32],
    reference: &[f32],
    scale: f32,
    rel_tol: f32,
    abs_tol: f32,
) -> ScaledComparison {
    assert_eq!(actual.len(), reference.len(), "Length mismatch");
    let mut result = ScaledComparison {
        max_abs_diff: 0.0,
        max_abs_diff_index: 0,
        mismatches: 0,
        total: actual.len(),
    };
    for (i, (&a, &r)) in actual.iter().zip(reference).enumerate() {
        let expected = scale * r;
        let diff = (a - expected).abs();
        if diff > result.max_abs_diff {
            result.max_abs_diff = diff;
            result.max_abs_diff_index = i;
        }
        if diff > abs_tol.max(expected.abs() * rel_tol) {
            result.mismatches += 1;
        }
    }
    result
}

/// Asserts that `actual` equals `scale * reference` within tolerance.
pub fn assert_scaled(actual: &[f32], reference: &[f32], scale: f32, rel_tol: f32, abs_tol: f32) {
    let result = compare_scaled(actual, reference, scale, rel_tol, abs_tol);
    assert!(
        result.mismatches == 0,
        "scaled comparison failed: {result}\n  actual[{i}]={}, scale * reference[{i}]={}",
        actual[result.max_abs_diff_index],
        scale * reference[result.max_abs_diff_index],
        i = result.max_abs_diff_index,
    );
}

/// Asserts that every sample of every channel is finite and within the
/// FloatS16 range.
pub fn assert_within_float_s16<C: AsRef<[f32]>>(channels: &[C]) {
    for (ch, channel) in channels.iter().enumerate() {
        for (i, &s) in channel.as_ref().iter().enumerate() {
            assert!(
                s.is_finite() && (FLOAT_S16_MIN..=FLOAT_S16_MAX).contains(&s),
                "sample {i} of channel {ch} out of range: {s}"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_buffers_pass() {
        let a = [1.0f32, 2.0, 3.0];
        assert_scaled(&a, &a, 1.0, 0.0, 1e-6);
    }

    #[test]
    fn scaled_buffers_pass() {
        let reference = [1.0f32, -2.0, 3.0];
        let actual = [10.0f32, -20.0, 30.0];
        assert_scaled(&actual, &reference, 10.0, 1e-6, 1e-6);
    }

    #[test]
    #[should_panic(expected = "scaled comparison failed")]
    fn wrong_scale_fails() {
        let reference = [1.0f32, 2.0];
        let actual = [2.0f32, 4.0];
        assert_scaled(&actual, &reference, 3.0, 1e-3, 1e-3);
    }

    #[test]
    fn comparison_statistics() {
        let reference = [1.0f32, 2.0, 3.0, 4.0];
        let actual = [2.2f32, 4.0, 6.1, 8.0];
        let result = compare_scaled(&actual, &reference, 2.0, 0.0, 0.15);
        assert!((result.max_abs_diff - 0.2).abs() < 1e-5);
        assert_eq!(result.max_abs_diff_index, 0);
        assert_eq!(result.mismatches, 1);
        assert_eq!(result.total, 4);
    }

    #[test]
    fn full_scale_samples_are_in_range() {
        assert_within_float_s16(&[vec![FLOAT_S16_MIN, 0.0, FLOAT_S16_MAX]]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn sample_above_full_scale_is_out_of_range() {
        assert_within_float_s16(&[[0.0f32, 32767.5]]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn nan_is_out_of_range() {
        assert_within_float_s16(&[[f32::NAN]]);
    }
}
