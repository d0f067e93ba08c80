//! Constants and helpers shared by the fixed digital controller.
//!
//! Samples are in FloatS16 scale: full scale is `INPUT_LEVEL_SCALING`.

pub const MIN_SAMPLE_VALUE: f32 = -32768.0;
pub const MAX_SAMPLE_VALUE: f32 = 32767.0;

/// Linear level corresponding to 0 dBFS.
pub const INPUT_LEVEL_SCALING: f64 = 32768.0;

/// Level in dBFS reported for inputs at or below one FloatS16 step.
pub const MIN_DBFS: f64 = -90.308_998_699_194_35;

pub const FRAME_DURATION_MS: usize = 10;

// Limiter params.
pub const LIMITER_MAX_INPUT_LEVEL_DB: f64 = 1.0;
pub const LIMITER_KNEE_SMOOTHNESS_DB: f64 = 1.0;
pub const LIMITER_COMPRESSION_RATIO: f64 = 5.0;

// Number of interpolation points for each region of the limiter.
// These values have been tuned to limit the interpolated gain curve error given
// the limiter parameters and allowing a maximum error of +/- 32768^-1.
pub const INTERPOLATED_GAIN_CURVE_KNEE_POINTS: usize = 22;
pub const INTERPOLATED_GAIN_CURVE_BEYOND_KNEE_POINTS: usize = 10;

/// Converts a dBFS level to FloatS16 linear scale.
pub fn dbfs_to_linear(level: f64) -> f64 {
    INPUT_LEVEL_SCALING * 10.0_f64.powf(level / 20.0)
}

/// Converts a FloatS16 linear level to dBFS, flooring at [`MIN_DBFS`].
pub fn linear_to_dbfs(level: f64) -> f64 {
    if level.abs() <= INPUT_LEVEL_SCALING / 32768.0 {
        return MIN_DBFS;
    }
    20.0 * (level / INPUT_LEVEL_SCALING).log10()
}

/// Returns `num_points` evenly spaced points over `[l, r]`.
///
/// The end points are returned exactly. Panics if `num_points < 2`.
pub fn lin_space(l: f64, r: f64, num_points: usize) -> Vec<f64> {
    assert!(num_points >= 2, "lin_space needs at least 2 points");
    let step = (r - l) / (num_points - 1) as f64;
    let mut points = Vec::with_capacity(num_points);
    points.push(l);
    points.extend((1..num_points - 1).map(|i| l + i as f64 * step));
    points.push(r);
    points
}
