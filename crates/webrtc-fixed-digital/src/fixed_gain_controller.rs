//! Fixed digital gain followed by an optional limiter and a hard clipper.

use crate::Error;
use crate::common::{MAX_SAMPLE_VALUE, MIN_SAMPLE_VALUE};
use crate::config::FixedDigitalConfig;
use crate::data_dumper::ApmDataDumper;
use crate::gain_curve_applier::GainCurveApplier;
use crate::interpolated_gain_curve::GainCurveStats;

/// Applies a fixed gain to FloatS16 frames and keeps the output within full
/// scale.
///
/// Without a limiter the gained signal is only hard-clipped. With one, the
/// limiter pulls loud passages under full scale first so that clipping only
/// trims the residual approximation error.
#[derive(Debug)]
pub struct FixedGainController {
    gain_to_apply: f32,
    apm_data_dumper: ApmDataDumper,
    gain_curve_applier: Option<GainCurveApplier>,
}

impl FixedGainController {
    pub fn new(config: &FixedDigitalConfig) -> Result<Self, Error> {
        let gain_to_apply = 10.0_f32.powf(config.gain_db / 20.0);
        if !(gain_to_apply.is_finite() && gain_to_apply > 0.0) {
            return Err(Error::InvalidGain {
                gain_db: config.gain_db,
            });
        }

        let apm_data_dumper = ApmDataDumper::new(config.instance_index);
        let gain_curve_applier = config
            .limiter
            .map(|level_estimator| {
                GainCurveApplier::new(
                    &level_estimator,
                    config.curve,
                    config.approximation,
                    apm_data_dumper,
                )
            })
            .transpose()?;

        tracing::debug!(
            instance = config.instance_index,
            gain_db = config.gain_db,
            gain_to_apply,
            limiter = ?config.limiter,
            "fixed gain controller created"
        );

        Ok(Self {
            gain_to_apply,
            apm_data_dumper,
            gain_curve_applier,
        })
    }

    /// Processes a multi-channel FloatS16 frame in place.
    ///
    /// Every output sample lies in `[-32768, 32767]` for finite input. Panics
    /// if the limiter is enabled and the frame does not match its frame size.
    pub fn process(&mut self, signal: &mut [&mut [f32]]) {
        // Apply fixed digital gain.
        if self.gain_to_apply != 1.0 {
            for channel in signal.iter_mut() {
                for sample in channel.iter_mut() {
                    *sample *= self.gain_to_apply;
                }
            }
        }

        if let Some(gain_curve_applier) = &mut self.gain_curve_applier {
            gain_curve_applier.process(signal);

            if let Some(first_channel) = signal.first() {
                self.apm_data_dumper
                    .dump_raw("agc2_fixed_digital_gain_curve_applier", first_channel);
            }
        }

        // Hard-clipping. `min`/`max` map NaN to a bound, `clamp` would keep it.
        for channel in signal.iter_mut() {
            for sample in channel.iter_mut() {
                *sample = sample.min(MAX_SAMPLE_VALUE).max(MIN_SAMPLE_VALUE);
            }
        }
    }

    /// Lookup counters of the limiter gain curve. Unavailable when the
    /// limiter is disabled.
    pub fn gain_curve_stats(&self) -> GainCurveStats {
        self.gain_curve_applier
            .as_ref()
            .map(GainCurveApplier::gain_curve_stats)
            .unwrap_or_default()
    }

    /// Linear gain applied before limiting.
    pub fn gain_to_apply(&self) -> f32 {
        self.gain_to_apply
    }

    pub fn has_limiter(&self) -> bool {
        self.gain_curve_applier.is_some()
    }

    pub(crate) fn apm_data_dumper(&self) -> &ApmDataDumper {
        &self.apm_data_dumper
    }
}

impl Drop for FixedGainController {
    fn drop(&mut self) {
        let stats = self.gain_curve_stats();
        if !stats.available {
            return;
        }
        let dumper = &self.apm_data_dumper;
        dumper.dump_value(
            "agc2_interp_gain_curve_lookups_identity",
            stats.look_ups_identity_region as f64,
        );
        dumper.dump_value(
            "agc2_interp_gain_curve_lookups_knee",
            stats.look_ups_knee_region as f64,
        );
        dumper.dump_value(
            "agc2_interp_gain_curve_lookups_limiter",
            stats.look_ups_limiter_region as f64,
        );
        dumper.dump_value(
            "agc2_interp_gain_curve_lookups_saturation",
            stats.look_ups_saturation_region as f64,
        );
    }
}
