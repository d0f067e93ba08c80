//! Analytic limiter gain curve.
//!
//! The curve maps an input level to an output level in dBFS and has three
//! regions: identity, knee (quadratic in dB) and compression (linear in dB
//! with slope `1 / compression_ratio`, reaching 0 dBFS at the max input
//! level). Levels above the max input level are the saturation region, where
//! the compression formula keeps applying.

use crate::Error;
use crate::common::{INPUT_LEVEL_SCALING, MIN_DBFS, dbfs_to_linear, linear_to_dbfs};
use crate::config::LimiterCurveParams;

/// Limiter gain curve in closed form. All math is done in `f64`.
#[derive(Debug, Clone)]
pub struct LimiterDbGainCurve {
    params: LimiterCurveParams,
    max_input_level_linear: f64,
    /// Signals with level `<= knee_start_dbfs` are left untouched.
    knee_start_dbfs: f64,
    knee_start_linear: f64,
    /// Upper end of the knee region.
    limiter_start_dbfs: f64,
    limiter_start_linear: f64,
    /// Coefficients `[a, b, c]` of the knee polynomial `ax^2 + bx + c` (dB).
    knee_region_polynomial: [f64; 3],
    // First derivative of `get_gain_linear()`: `d1 * (x / 32768)^d2`.
    gain_curve_limiter_d1: f64,
    gain_curve_limiter_d2: f64,
    // Integral of `get_gain_linear()`: `i2 * x^i1`.
    gain_curve_limiter_i1: f64,
    gain_curve_limiter_i2: f64,
}

fn compute_knee_start(params: &LimiterCurveParams) -> f64 {
    -params.knee_smoothness_db / 2.0
        - params.max_input_level_db / (params.compression_ratio - 1.0)
}

fn compute_knee_region_polynomial(knee_start_dbfs: f64, params: &LimiterCurveParams) -> [f64; 3] {
    let ratio = params.compression_ratio;
    let a = (1.0 - ratio) / (2.0 * params.knee_smoothness_db * ratio);
    let b = 1.0 - 2.0 * a * knee_start_dbfs;
    let c = a * knee_start_dbfs * knee_start_dbfs;
    [a, b, c]
}

/// Gain at 0 dBFS input within the compression region.
fn compression_gain_at_full_scale(params: &LimiterCurveParams) -> f64 {
    10.0_f64.powf(-params.max_input_level_db / (20.0 * params.compression_ratio))
}

impl LimiterDbGainCurve {
    /// Builds the curve, checking that the parameters describe a valid knee.
    pub fn new(params: LimiterCurveParams) -> Result<Self, Error> {
        if !(params.knee_smoothness_db > 0.0) || !params.knee_smoothness_db.is_finite() {
            return Err(Error::InvalidKneeSmoothness(params.knee_smoothness_db));
        }
        if !(params.compression_ratio > 1.0) || !params.compression_ratio.is_finite() {
            return Err(Error::InvalidCompressionRatio(params.compression_ratio));
        }

        let knee_start_dbfs = compute_knee_start(&params);
        let limiter_start_dbfs = knee_start_dbfs + params.knee_smoothness_db;
        // The upper bound is equivalent to
        // (ratio - 1) * smoothness / (2 * ratio) < max input level. Below
        // MIN_DBFS levels cannot be told apart, so the knee must start above it.
        if !params.max_input_level_db.is_finite()
            || !(limiter_start_dbfs < params.max_input_level_db)
            || !(knee_start_dbfs > MIN_DBFS)
        {
            return Err(Error::InvalidKneeRegion {
                knee_start_dbfs,
                limiter_start_dbfs,
                max_input_level_db: params.max_input_level_db,
            });
        }

        Ok(Self::from_valid_params(params))
    }

    fn from_valid_params(params: LimiterCurveParams) -> Self {
        let ratio = params.compression_ratio;
        let knee_start_dbfs = compute_knee_start(&params);
        let limiter_start_dbfs = knee_start_dbfs + params.knee_smoothness_db;
        let full_scale_gain = compression_gain_at_full_scale(&params);
        let gain_curve_limiter_i1 = 1.0 / ratio;

        Self {
            params,
            max_input_level_linear: dbfs_to_linear(params.max_input_level_db),
            knee_start_dbfs,
            knee_start_linear: dbfs_to_linear(knee_start_dbfs),
            limiter_start_dbfs,
            limiter_start_linear: dbfs_to_linear(limiter_start_dbfs),
            knee_region_polynomial: compute_knee_region_polynomial(knee_start_dbfs, &params),
            gain_curve_limiter_d1: full_scale_gain * (1.0 - ratio) / ratio / INPUT_LEVEL_SCALING,
            gain_curve_limiter_d2: (1.0 - 2.0 * ratio) / ratio,
            gain_curve_limiter_i1,
            gain_curve_limiter_i2: full_scale_gain
                / gain_curve_limiter_i1
                / INPUT_LEVEL_SCALING.powf(gain_curve_limiter_i1 - 1.0),
        }
    }

    pub fn params(&self) -> &LimiterCurveParams {
        &self.params
    }

    pub fn max_input_level_db(&self) -> f64 {
        self.params.max_input_level_db
    }

    pub fn max_input_level_linear(&self) -> f64 {
        self.max_input_level_linear
    }

    pub fn knee_start_dbfs(&self) -> f64 {
        self.knee_start_dbfs
    }

    pub fn knee_start_linear(&self) -> f64 {
        self.knee_start_linear
    }

    pub fn limiter_start_dbfs(&self) -> f64 {
        self.limiter_start_dbfs
    }

    pub fn limiter_start_linear(&self) -> f64 {
        self.limiter_start_linear
    }

    /// Returns the output level in dBFS given an input level in dBFS.
    pub fn get_output_level_dbfs(&self, input_level_dbfs: f64) -> f64 {
        if input_level_dbfs < self.knee_start_dbfs {
            input_level_dbfs
        } else if input_level_dbfs < self.limiter_start_dbfs {
            self.get_knee_region_output_level_dbfs(input_level_dbfs)
        } else {
            self.get_compressor_region_output_level_dbfs(input_level_dbfs)
        }
    }

    /// Returns the gain (linear scale) for a given input level (linear scale).
    pub fn get_gain_linear(&self, input_level_linear: f64) -> f64 {
        if input_level_linear < self.knee_start_linear {
            return 1.0;
        }
        dbfs_to_linear(self.get_output_level_dbfs(linear_to_dbfs(input_level_linear)))
            / input_level_linear
    }

    /// First derivative of [`get_gain_linear`](Self::get_gain_linear) at `x`.
    /// Beyond-knee region only.
    pub fn get_gain_first_derivative_linear(&self, x: f64) -> f64 {
        // Tolerates `x` landing a rounding step below the limiter start.
        debug_assert!(x >= self.limiter_start_linear - 1e-7 * INPUT_LEVEL_SCALING);
        self.gain_curve_limiter_d1 * (x / INPUT_LEVEL_SCALING).powf(self.gain_curve_limiter_d2)
    }

    /// Integral of [`get_gain_linear`](Self::get_gain_linear) over `[x0, x1]`.
    /// Beyond-knee region only.
    pub fn get_gain_integral_linear(&self, x0: f64, x1: f64) -> f64 {
        debug_assert!(x0 <= x1);
        debug_assert!(x0 >= self.limiter_start_linear);
        let limiter_integral =
            |x: f64| self.gain_curve_limiter_i2 * x.powf(self.gain_curve_limiter_i1);
        limiter_integral(x1) - limiter_integral(x0)
    }

    fn get_knee_region_output_level_dbfs(&self, input_level_dbfs: f64) -> f64 {
        let [a, b, c] = self.knee_region_polynomial;
        a * input_level_dbfs * input_level_dbfs + b * input_level_dbfs + c
    }

    fn get_compressor_region_output_level_dbfs(&self, input_level_dbfs: f64) -> f64 {
        (input_level_dbfs - self.params.max_input_level_db) / self.params.compression_ratio
    }
}

impl Default for LimiterDbGainCurve {
    fn default() -> Self {
        Self::from_valid_params(LimiterCurveParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Visits levels from -90 dBFS to the max input level in 0.5 dB steps.
    fn for_each_level(l: &LimiterDbGainCurve, mut f: impl FnMut(f64)) {
        let mut level = -90.0_f64;
        while level <= l.max_input_level_db() {
            f(level);
            level += 0.5;
        }
    }

    #[test]
    fn construct() {
        let l = LimiterDbGainCurve::new(LimiterCurveParams::default()).unwrap();
        assert!(l.knee_start_linear() < l.limiter_start_linear());
        assert!(l.limiter_start_linear() < l.max_input_level_linear());
    }

    #[test]
    fn default_matches_validated_construction() {
        let a = LimiterDbGainCurve::default();
        let b = LimiterDbGainCurve::new(LimiterCurveParams::default()).unwrap();
        assert_eq!(a.knee_start_dbfs(), b.knee_start_dbfs());
        assert_eq!(a.limiter_start_dbfs(), b.limiter_start_dbfs());
        assert_eq!(a.max_input_level_linear(), b.max_input_level_linear());
        assert_eq!(
            a.get_gain_first_derivative_linear(a.max_input_level_linear()),
            b.get_gain_first_derivative_linear(b.max_input_level_linear())
        );
    }

    #[test]
    fn gain_curve_should_be_monotone() {
        let l = LimiterDbGainCurve::default();
        let mut last_output_level = None;
        for_each_level(&l, |level| {
            let current_output_level = l.get_output_level_dbfs(level);
            if let Some(last) = last_output_level {
                assert!(
                    last <= current_output_level,
                    "not monotone at level {level}: {last} > {current_output_level}"
                );
            }
            last_output_level = Some(current_output_level);
        });
    }

    #[test]
    fn gain_curve_should_be_continuous() {
        const MAX_DELTA: f64 = 0.5;
        let l = LimiterDbGainCurve::default();
        let mut last_output_level = None;
        for_each_level(&l, |level| {
            let current_output_level = l.get_output_level_dbfs(level);
            if let Some(last) = last_output_level {
                assert!(
                    current_output_level <= last + MAX_DELTA,
                    "not continuous at level {level}"
                );
            }
            last_output_level = Some(current_output_level);
        });
    }

    #[test]
    fn output_level_should_not_exceed_full_scale() {
        let l = LimiterDbGainCurve::default();
        for_each_level(&l, |level| {
            let current_output_level = l.get_output_level_dbfs(level);
            assert!(
                current_output_level <= 0.0,
                "output {current_output_level} > 0 at level {level}"
            );
        });
        assert!(l.get_output_level_dbfs(l.max_input_level_db()).abs() < 1e-12);
    }

    #[test]
    fn knee_joins_neighbouring_regions() {
        let l = LimiterDbGainCurve::default();
        let knee = |x: f64| l.get_knee_region_output_level_dbfs(x);
        let compressor = |x: f64| l.get_compressor_region_output_level_dbfs(x);
        assert!((knee(l.knee_start_dbfs()) - l.knee_start_dbfs()).abs() < 1e-12);
        assert!((knee(l.limiter_start_dbfs()) - compressor(l.limiter_start_dbfs())).abs() < 1e-12);
    }

    #[test]
    fn gain_is_unity_below_knee_start() {
        let l = LimiterDbGainCurve::default();
        for level in [0.0, 1.0, 100.0, l.knee_start_linear() * 0.999] {
            assert_eq!(1.0, l.get_gain_linear(level));
        }
        assert!(l.get_gain_linear(l.limiter_start_linear()) < 1.0);
    }

    #[test]
    fn derivative_matches_finite_difference() {
        let l = LimiterDbGainCurve::default();
        let h = 1e-3;
        for x in [
            l.limiter_start_linear() + 1.0,
            (l.limiter_start_linear() + l.max_input_level_linear()) / 2.0,
            l.max_input_level_linear(),
        ] {
            let numeric = (l.get_gain_linear(x + h) - l.get_gain_linear(x - h)) / (2.0 * h);
            let analytic = l.get_gain_first_derivative_linear(x);
            assert!(
                (numeric - analytic).abs() < 1e-9,
                "derivative at {x}: {analytic} vs {numeric}"
            );
        }
    }

    #[test]
    fn integral_matches_trapezoid_rule() {
        let l = LimiterDbGainCurve::default();
        let x0 = l.limiter_start_linear();
        let x1 = l.max_input_level_linear();
        let n = 10_000;
        let dx = (x1 - x0) / n as f64;
        let numeric: f64 = (0..n)
            .map(|i| {
                let a = x0 + i as f64 * dx;
                (l.get_gain_linear(a) + l.get_gain_linear(a + dx)) * dx / 2.0
            })
            .sum();
        let analytic = l.get_gain_integral_linear(x0, x1);
        assert!(
            (numeric - analytic).abs() < 1e-6 * analytic,
            "integral {analytic} vs {numeric}"
        );
    }

    #[test]
    fn rejects_invalid_params() {
        let defaults = LimiterCurveParams::default();
        assert_eq!(
            Err(Error::InvalidKneeSmoothness(0.0)),
            LimiterDbGainCurve::new(LimiterCurveParams {
                knee_smoothness_db: 0.0,
                ..defaults
            })
            .map(|_| ())
        );
        assert_eq!(
            Err(Error::InvalidCompressionRatio(1.0)),
            LimiterDbGainCurve::new(LimiterCurveParams {
                compression_ratio: 1.0,
                ..defaults
            })
            .map(|_| ())
        );
        // The max input level must exceed (5 - 1) * 1 / 10 = 0.4 dB.
        assert!(matches!(
            LimiterDbGainCurve::new(LimiterCurveParams {
                max_input_level_db: 0.3,
                ..defaults
            }),
            Err(Error::InvalidKneeRegion { .. })
        ));
        assert!(
            LimiterDbGainCurve::new(LimiterCurveParams {
                max_input_level_db: 0.41,
                ..defaults
            })
            .is_ok()
        );
    }

    #[test]
    fn rejects_knee_below_min_dbfs() {
        // knee_start = -0.5 - 1 / (ratio - 1) dBFS.
        for compression_ratio in [1.001, 1.01] {
            let params = LimiterCurveParams {
                compression_ratio,
                ..LimiterCurveParams::default()
            };
            assert!(
                matches!(
                    LimiterDbGainCurve::new(params),
                    Err(Error::InvalidKneeRegion { knee_start_dbfs, .. }) if knee_start_dbfs <= MIN_DBFS
                ),
                "ratio {compression_ratio} accepted"
            );
        }
        // -0.5 - 1 / 0.012 = -83.8 dBFS is still resolvable.
        let l = LimiterDbGainCurve::new(LimiterCurveParams {
            compression_ratio: 1.012,
            ..LimiterCurveParams::default()
        })
        .unwrap();
        assert!(l.knee_start_linear() > 1.0);
    }
}
