//! Applies the limiter gain curve with per-sample interpolated scaling.

use derive_more::Debug;

use crate::Error;
use crate::config::{ApproximationPoints, LevelEstimatorConfig, LimiterCurveParams};
use crate::data_dumper::ApmDataDumper;
use crate::interpolated_gain_curve::{GainCurveStats, InterpolatedGainCurve};
use crate::level_estimator::LevelEstimator;
use crate::limiter_db_gain_curve::LimiterDbGainCurve;

/// Power used for interpolation of the first sub-frame during attack.
/// Reduces the chances of over-shooting (and hence saturation).
const ATTACK_FIRST_SUBFRAME_INTERPOLATION_POWER: i32 = 8;

fn interpolate_first_subframe(last_factor: f32, current_factor: f32, subframe: &mut [f32]) {
    let n = subframe.len() as f32;
    for (i, factor) in subframe.iter_mut().enumerate() {
        let t = i as f32 / n;
        *factor = (1.0 - t).powi(ATTACK_FIRST_SUBFRAME_INTERPOLATION_POWER)
            * (last_factor - current_factor)
            + current_factor;
    }
}

fn compute_per_sample_subframe_factors(
    scaling_factors: &[f32],
    per_sample_scaling_factors: &mut [f32],
) {
    let num_subframes = scaling_factors.len() - 1;
    let subframe_size = per_sample_scaling_factors.len() / num_subframes;
    debug_assert_eq!(per_sample_scaling_factors.len() % num_subframes, 0);

    if subframe_size == 1 {
        per_sample_scaling_factors.copy_from_slice(&scaling_factors[1..]);
        return;
    }

    // Handle first sub-frame differently in case of attack.
    let is_attack = scaling_factors[0] > scaling_factors[1];
    if is_attack {
        interpolate_first_subframe(
            scaling_factors[0],
            scaling_factors[1],
            &mut per_sample_scaling_factors[..subframe_size],
        );
    }

    let start = usize::from(is_attack);
    let subframes = per_sample_scaling_factors.chunks_exact_mut(subframe_size);
    for (i, subframe) in subframes.enumerate().skip(start) {
        let scaling_start = scaling_factors[i];
        let scaling_diff = (scaling_factors[i + 1] - scaling_start) / subframe_size as f32;
        for (j, factor) in subframe.iter_mut().enumerate() {
            *factor = scaling_start + scaling_diff * j as f32;
        }
    }
}

fn scale_samples(per_sample_scaling_factors: &[f32], signal: &mut [&mut [f32]]) {
    for channel in signal.iter_mut() {
        debug_assert_eq!(channel.len(), per_sample_scaling_factors.len());
        for (sample, &factor) in channel.iter_mut().zip(per_sample_scaling_factors) {
            *sample *= factor;
        }
    }
}

/// Limiter stage: estimates the level of each sub-frame, maps it through the
/// interpolated gain curve and scales the signal with per-sample factors.
///
/// Sub-frame gains are linearly interpolated across each sub-frame, except for
/// the first sub-frame of an attack, which follows a power ramp to react fast.
#[derive(Debug)]
pub struct GainCurveApplier {
    data_dumper: ApmDataDumper,
    interp_gain_curve: InterpolatedGainCurve,
    level_estimator: LevelEstimator,
    #[debug(skip)]
    scaling_factors: Vec<f32>,
    #[debug(skip)]
    per_sample_scaling_factors: Vec<f32>,
    last_scaling_factor: f32,
}

impl GainCurveApplier {
    pub fn new(
        level_estimator: &LevelEstimatorConfig,
        curve: LimiterCurveParams,
        approximation: ApproximationPoints,
        data_dumper: ApmDataDumper,
    ) -> Result<Self, Error> {
        let interp_gain_curve =
            InterpolatedGainCurve::new(LimiterDbGainCurve::new(curve)?, approximation)?;
        let level_estimator = LevelEstimator::new(level_estimator, data_dumper)?;
        Ok(Self {
            data_dumper,
            scaling_factors: vec![1.0; level_estimator.num_sub_frames() + 1],
            per_sample_scaling_factors: vec![1.0; level_estimator.samples_in_frame()],
            interp_gain_curve,
            level_estimator,
            last_scaling_factor: 1.0,
        })
    }

    /// Applies the limiter gain to every channel of a FloatS16 frame in place.
    ///
    /// Does not clip; samples may still exceed full scale by the small
    /// approximation error of the gain curve.
    pub fn process(&mut self, signal: &mut [&mut [f32]]) {
        let level_estimate = self.level_estimator.compute_level(&*signal);

        debug_assert_eq!(level_estimate.len() + 1, self.scaling_factors.len());
        self.scaling_factors[0] = self.last_scaling_factor;
        for (factor, &level) in self.scaling_factors[1..].iter_mut().zip(level_estimate) {
            *factor = self.interp_gain_curve.look_up_gain_to_apply(level);
        }

        compute_per_sample_subframe_factors(
            &self.scaling_factors,
            &mut self.per_sample_scaling_factors,
        );
        scale_samples(&self.per_sample_scaling_factors, signal);

        self.last_scaling_factor = self.scaling_factors[self.scaling_factors.len() - 1];
        self.data_dumper.dump_raw(
            "agc2_gain_curve_applier_scaling_factors",
            &self.per_sample_scaling_factors,
        );
    }

    pub fn gain_curve_stats(&self) -> GainCurveStats {
        self.interp_gain_curve.stats()
    }

    /// Returns the last level estimate.
    pub fn last_audio_level(&self) -> f32 {
        self.level_estimator.last_level()
    }
}
