//! Piecewise-linear approximation of the limiter gain curve.
//!
//! The approximation is built once from [`LimiterDbGainCurve`] and answers the
//! per sub-frame gain queries of the limiter. Knee pieces are secants between
//! evenly spaced samples; beyond-knee pieces are tangents at points chosen by a
//! greedy search that halves the interval with the largest area error.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use derive_more::Debug;

use crate::Error;
use crate::common::{INPUT_LEVEL_SCALING, lin_space};
use crate::config::ApproximationPoints;
use crate::limiter_db_gain_curve::LimiterDbGainCurve;

/// Largest rise of the approximated gain accepted across a boundary.
const GAIN_TOLERANCE: f32 = 1e-6;

/// Lookup counters, one per gain curve region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GainCurveStats {
    /// Region in which the output level equals the input one.
    pub look_ups_identity_region: usize,
    /// Smoothing between the identity and the limiter regions.
    pub look_ups_knee_region: usize,
    /// Region in which output and input levels are linearly related in dB.
    pub look_ups_limiter_region: usize,
    /// Input levels beyond the max expected by the limiter.
    pub look_ups_saturation_region: usize,
    /// True once at least one lookup has been made.
    pub available: bool,
}

/// Slope and y-intercept of the line tangent to the gain curve at `x`.
fn compute_linear_approximation_params(limiter: &LimiterDbGainCurve, x: f64) -> (f64, f64) {
    let m = limiter.get_gain_first_derivative_linear(x);
    let q = limiter.get_gain_linear(x) - m * x;
    (m, q)
}

/// Area under the two tangents at `x0` and `x1`, each used up to their
/// intersection.
fn compute_area_under_piecewise_linear_approximation(
    limiter: &LimiterDbGainCurve,
    x0: f64,
    x1: f64,
) -> f64 {
    debug_assert!(x0 < x1);
    let (m0, q0) = compute_linear_approximation_params(limiter, x0);
    let (m1, q1) = compute_linear_approximation_params(limiter, x1);

    let x_split = (q0 - q1) / (m1 - m0);
    debug_assert!(x0 < x_split && x_split < x1);

    let area = |xl: f64, xr: f64, m: f64, q: f64| xr * (m * xr / 2.0 + q) - xl * (m * xl / 2.0 + q);
    area(x0, x_split, m0, q0) + area(x_split, x1, m1, q1)
}

/// Difference between the area under the gain curve and under its tangent
/// under-approximation over `[x0, x1]`.
fn limiter_under_approximation_negative_error(
    limiter: &LimiterDbGainCurve,
    x0: f64,
    x1: f64,
) -> f64 {
    let area_limiter = limiter.get_gain_integral_linear(x0, x1);
    let area_interpolated = compute_area_under_piecewise_linear_approximation(limiter, x0, x1);
    debug_assert!(area_limiter >= area_interpolated);
    area_limiter - area_interpolated
}

struct Interval {
    x0: f64,
    x1: f64,
    error: f64,
}

impl Interval {
    fn new(limiter: &LimiterDbGainCurve, x0: f64, x1: f64) -> Self {
        Self {
            x0,
            x1,
            error: limiter_under_approximation_negative_error(limiter, x0, x1),
        }
    }
}

impl PartialEq for Interval {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Interval {}

impl PartialOrd for Interval {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Interval {
    fn cmp(&self, other: &Self) -> Ordering {
        self.error.total_cmp(&other.error)
    }
}

/// Finds where to place the beyond-knee tangents.
///
/// Greedy and therefore sub-optimal, but good in practice: starting from the
/// whole beyond-knee region, the interval with the largest error is halved
/// until `num_points` intervals exist. Returns their sorted right ends.
fn sample_limiter_region(limiter: &LimiterDbGainCurve, num_points: usize) -> Vec<f64> {
    let mut heap = BinaryHeap::with_capacity(num_points + 1);
    heap.push(Interval::new(
        limiter,
        limiter.limiter_start_linear(),
        limiter.max_input_level_linear(),
    ));

    while heap.len() < num_points {
        let Some(worst) = heap.pop() else {
            break;
        };
        let x_split = (worst.x0 + worst.x1) / 2.0;
        heap.push(Interval::new(limiter, worst.x0, x_split));
        heap.push(Interval::new(limiter, x_split, worst.x1));
    }

    let mut samples: Vec<f64> = heap.into_iter().map(|interval| interval.x1).collect();
    samples.sort_by(f64::total_cmp);
    samples
}

/// Gain curve lookup table.
///
/// `approximation_params_x` holds the left boundary of each linear piece
/// `gain = m * level + q`.
#[derive(Debug)]
pub struct InterpolatedGainCurve {
    limiter: LimiterDbGainCurve,
    knee_points: usize,
    max_input_level_linear: f64,
    #[debug(skip)]
    approximation_params_x: Vec<f32>,
    #[debug(skip)]
    approximation_params_m: Vec<f32>,
    #[debug(skip)]
    approximation_params_q: Vec<f32>,
    stats: GainCurveStats,
}

impl InterpolatedGainCurve {
    /// Builds the approximation of `limiter` with the given number of pieces
    /// per region. Each region needs more than 2 points, and the resulting
    /// `f32` table must be finite, increasing and non-rising in gain.
    pub fn new(limiter: LimiterDbGainCurve, points: ApproximationPoints) -> Result<Self, Error> {
        if points.knee <= 2 {
            return Err(Error::TooFewApproximationPoints {
                region: "knee",
                points: points.knee,
            });
        }
        if points.beyond_knee <= 2 {
            return Err(Error::TooFewApproximationPoints {
                region: "beyond-knee",
                points: points.beyond_knee,
            });
        }

        let curve = Self::from_valid_points(limiter, points);
        curve.check_approximation_params()?;
        let x = &curve.approximation_params_x;
        tracing::debug!(
            knee_points = points.knee,
            beyond_knee_points = points.beyond_knee,
            first_boundary = x[0],
            last_boundary = x[x.len() - 1],
            "interpolated gain curve ready"
        );
        Ok(curve)
    }

    fn from_valid_points(limiter: LimiterDbGainCurve, points: ApproximationPoints) -> Self {
        let total = points.total();
        let mut curve = Self {
            max_input_level_linear: limiter.max_input_level_linear(),
            limiter,
            knee_points: points.knee,
            approximation_params_x: vec![0.0; total],
            approximation_params_m: vec![0.0; total],
            approximation_params_q: vec![0.0; total],
            stats: GainCurveStats::default(),
        };
        curve.precompute_knee_approx_params();
        curve.precompute_beyond_knee_approx_params(points.beyond_knee);
        curve
    }

    /// Checks that the f32 table is usable: finite, with strictly increasing
    /// boundaries, and with gains that stay in `[0, 1]` and never rise.
    fn check_approximation_params(&self) -> Result<(), Error> {
        let x = &self.approximation_params_x;
        let m = &self.approximation_params_m;
        let q = &self.approximation_params_q;
        let gain_at = |piece: usize, level: f32| m[piece] * level + q[piece];
        let max_level = self.max_input_level_linear as f32;

        let mut prev_gain = 1.0_f32;
        for piece in 0..x.len() {
            let right = x.get(piece + 1).copied().unwrap_or(max_level);
            let left_gain = gain_at(piece, x[piece]);
            let right_gain = gain_at(piece, right);
            let valid = x[piece].is_finite()
                && m[piece].is_finite()
                && q[piece].is_finite()
                && x[piece] < right
                && left_gain <= prev_gain + GAIN_TOLERANCE
                && right_gain <= left_gain + GAIN_TOLERANCE
                && right_gain >= 0.0;
            if !valid {
                return Err(Error::DegenerateApproximation { piece });
            }
            prev_gain = right_gain;
        }
        Ok(())
    }

    pub fn limiter(&self) -> &LimiterDbGainCurve {
        &self.limiter
    }

    pub fn stats(&self) -> GainCurveStats {
        self.stats
    }

    /// Left boundaries of the linear pieces.
    pub fn approximation_params_x(&self) -> &[f32] {
        &self.approximation_params_x
    }

    /// Given a non-negative input level (linear scale), returns the scaling
    /// factor to apply to a sub-frame.
    ///
    /// Identity and saturation lookups cost O(1); knee and limiter lookups do a
    /// binary search over the piece boundaries. Levels at or above the max
    /// input level get the gain that takes them exactly to full scale.
    pub fn look_up_gain_to_apply(&mut self, input_level: f32) -> f32 {
        self.update_stats(input_level);

        if input_level <= self.approximation_params_x[0] {
            // Identity region.
            return 1.0;
        }

        if f64::from(input_level) >= self.max_input_level_linear {
            // Saturating lower bound: saturating samples hit the clipping level
            // exactly. Lowest harmonic distortion, at the cost of attenuating
            // the neighbouring non-saturating samples more than the curve would.
            return INPUT_LEVEL_SCALING as f32 / input_level;
        }

        let index = self
            .approximation_params_x
            .partition_point(|&x| x < input_level)
            .saturating_sub(1);
        debug_assert!(self.approximation_params_x[index] <= input_level);
        debug_assert!(
            index + 1 == self.approximation_params_x.len()
                || input_level <= self.approximation_params_x[index + 1]
        );

        let gain =
            self.approximation_params_m[index] * input_level + self.approximation_params_q[index];
        debug_assert!(gain >= 0.0);
        gain
    }

    fn update_stats(&mut self, input_level: f32) {
        self.stats.available = true;

        if input_level < self.approximation_params_x[0] {
            self.stats.look_ups_identity_region += 1;
        } else if input_level < self.approximation_params_x[self.knee_points - 1] {
            self.stats.look_ups_knee_region += 1;
        } else if f64::from(input_level) < self.max_input_level_linear {
            self.stats.look_ups_limiter_region += 1;
        } else {
            self.stats.look_ups_saturation_region += 1;
        }
    }

    /// Secants over the knee region. The first interval is halved to follow
    /// the high curvature at the start of the knee.
    fn precompute_knee_approx_params(&mut self) {
        let knee_points = self.knee_points;
        let points = lin_space(
            self.limiter.knee_start_linear(),
            self.limiter.limiter_start_linear(),
            knee_points - 1,
        );

        let x = &mut self.approximation_params_x;
        x[0] = points[0] as f32;
        x[1] = ((points[0] + points[1]) / 2.0) as f32;
        for (dst, &point) in x[2..knee_points].iter_mut().zip(&points[1..]) {
            *dst = point as f32;
        }

        for i in 0..knee_points - 1 {
            let x0 = f64::from(self.approximation_params_x[i]);
            let x1 = f64::from(self.approximation_params_x[i + 1]);
            let y0 = self.limiter.get_gain_linear(x0);
            let y1 = self.limiter.get_gain_linear(x1);
            let m = (y1 - y0) / (x1 - x0);
            self.approximation_params_m[i] = m as f32;
            self.approximation_params_q[i] = (y0 - f64::from(m as f32) * x0) as f32;
        }
    }

    /// Tangents over the beyond-knee region, bounded by the intersections of
    /// adjacent tangents.
    fn precompute_beyond_knee_approx_params(&mut self, beyond_knee_points: usize) {
        let knee_points = self.knee_points;
        let samples = sample_limiter_region(&self.limiter, beyond_knee_points);

        let first = f64::from(self.approximation_params_x[knee_points - 1]);
        let tangent_points = std::iter::once(first).chain(samples);
        for (i, x) in tangent_points.enumerate() {
            let (m, q) = compute_linear_approximation_params(&self.limiter, x);
            self.approximation_params_m[knee_points - 1 + i] = m as f32;
            self.approximation_params_q[knee_points - 1 + i] = q as f32;
        }

        for i in knee_points..knee_points + beyond_knee_points {
            let q0 = f64::from(self.approximation_params_q[i - 1]);
            let q1 = f64::from(self.approximation_params_q[i]);
            let m0 = f64::from(self.approximation_params_m[i - 1]);
            let m1 = f64::from(self.approximation_params_m[i]);
            self.approximation_params_x[i] = ((q0 - q1) / (m1 - m0)) as f32;
        }
    }
}

impl Default for InterpolatedGainCurve {
    fn default() -> Self {
        Self::from_valid_points(LimiterDbGainCurve::default(), ApproximationPoints::default())
    }
}
