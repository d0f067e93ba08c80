//! Construction-time configuration.

use crate::common::{
    INTERPOLATED_GAIN_CURVE_BEYOND_KNEE_POINTS, INTERPOLATED_GAIN_CURVE_KNEE_POINTS,
    LIMITER_COMPRESSION_RATIO, LIMITER_KNEE_SMOOTHNESS_DB, LIMITER_MAX_INPUT_LEVEL_DB,
};

/// Shape of the limiter gain curve in the dB domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimiterCurveParams {
    /// Input level (dBFS) mapped to 0 dBFS.
    pub max_input_level_db: f64,
    /// Width of the knee region (dB).
    pub knee_smoothness_db: f64,
    /// Compression ratio beyond the knee; must be greater than 1.
    pub compression_ratio: f64,
}

impl Default for LimiterCurveParams {
    fn default() -> Self {
        Self {
            max_input_level_db: LIMITER_MAX_INPUT_LEVEL_DB,
            knee_smoothness_db: LIMITER_KNEE_SMOOTHNESS_DB,
            compression_ratio: LIMITER_COMPRESSION_RATIO,
        }
    }
}

/// Number of linear pieces used to approximate each region of the curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApproximationPoints {
    pub knee: usize,
    pub beyond_knee: usize,
}

impl ApproximationPoints {
    pub fn total(&self) -> usize {
        self.knee + self.beyond_knee
    }
}

impl Default for ApproximationPoints {
    fn default() -> Self {
        Self {
            knee: INTERPOLATED_GAIN_CURVE_KNEE_POINTS,
            beyond_knee: INTERPOLATED_GAIN_CURVE_BEYOND_KNEE_POINTS,
        }
    }
}

/// Level estimator settings. Their presence enables the limiter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelEstimatorConfig {
    /// Sub-frames per 10 ms frame; the samples in a frame must divide evenly.
    pub num_sub_frames: usize,
    /// Time for the estimate to rise by 1 dB. Zero means instant attack.
    pub attack_ms: f32,
    /// Time for the estimate to fall by 1 dB. Zero means instant decay.
    pub decay_ms: f32,
    pub sample_rate_hz: usize,
}

impl LevelEstimatorConfig {
    /// Settings used by the production gain controller.
    pub fn production(sample_rate_hz: usize) -> Self {
        Self {
            num_sub_frames: 20,
            attack_ms: 0.0,
            decay_ms: 100.0,
            sample_rate_hz,
        }
    }
}

/// Configuration of a [`FixedGainController`](crate::fixed_gain_controller::FixedGainController).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedDigitalConfig {
    /// Fixed gain applied to every sample before limiting.
    pub gain_db: f32,
    /// Limiter settings; `None` applies the fixed gain and hard-clips only.
    pub limiter: Option<LevelEstimatorConfig>,
    pub curve: LimiterCurveParams,
    pub approximation: ApproximationPoints,
    /// Identifies this instance in debug recordings.
    pub instance_index: usize,
}

impl FixedDigitalConfig {
    /// Fixed gain without limiter.
    pub fn without_limiter(gain_db: f32) -> Self {
        Self {
            gain_db,
            limiter: None,
            ..Default::default()
        }
    }

    /// Fixed gain followed by the limiter.
    pub fn with_limiter(gain_db: f32, level_estimator: LevelEstimatorConfig) -> Self {
        Self {
            gain_db,
            limiter: Some(level_estimator),
            ..Default::default()
        }
    }
}

impl Default for FixedDigitalConfig {
    fn default() -> Self {
        Self {
            gain_db: 0.0,
            limiter: None,
            curve: LimiterCurveParams::default(),
            approximation: ApproximationPoints::default(),
            instance_index: 0,
        }
    }
}
