//! Gain Controller 2: host-facing wrapper around the fixed digital controller.

use std::fmt;

use crate::Error;
use crate::config::{FixedDigitalConfig, LevelEstimatorConfig};
use crate::fixed_gain_controller::FixedGainController;
use crate::interpolated_gain_curve::GainCurveStats;

/// Sample rates the host may run the controller at.
const SUPPORTED_SAMPLE_RATES_HZ: [usize; 4] = [8000, 16000, 32000, 48000];

/// Fixed gain values accepted by [`GainController2Config::validate`] are in
/// `[0, MAX_FIXED_GAIN_DB)`.
const MAX_FIXED_GAIN_DB: f32 = 50.0;

/// Host configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainController2Config {
    pub enabled: bool,
    pub fixed_gain_db: f32,
}

impl Default for GainController2Config {
    fn default() -> Self {
        Self {
            enabled: false,
            fixed_gain_db: 0.0,
        }
    }
}

impl GainController2Config {
    /// Validates the configuration.
    pub fn validate(&self) -> bool {
        self.fixed_gain_db >= 0.0 && self.fixed_gain_db < MAX_FIXED_GAIN_DB
    }
}

impl fmt::Display for GainController2Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{enabled: {}, fixed_gain_db: {}}}",
            self.enabled, self.fixed_gain_db
        )
    }
}

/// Applies the configured fixed gain followed by the production limiter
/// (20 sub-frames, instant attack, 100 ms decay).
#[derive(Debug)]
pub struct GainController2 {
    sample_rate_hz: usize,
    fixed_gain_controller: FixedGainController,
}

impl GainController2 {
    pub fn new(
        sample_rate_hz: usize,
        config: &GainController2Config,
        instance_index: usize,
    ) -> Result<Self, Error> {
        if !SUPPORTED_SAMPLE_RATES_HZ.contains(&sample_rate_hz) {
            return Err(Error::UnsupportedSampleRate(sample_rate_hz));
        }
        if !config.validate() {
            tracing::error!(%config, "Invalid GainController2 config");
            return Err(Error::InvalidConfig);
        }

        let fixed_gain_controller = FixedGainController::new(&FixedDigitalConfig {
            instance_index,
            ..FixedDigitalConfig::with_limiter(
                config.fixed_gain_db,
                LevelEstimatorConfig::production(sample_rate_hz),
            )
        })?;

        fixed_gain_controller
            .apm_data_dumper()
            .dump_value("gain_", f64::from(fixed_gain_controller.gain_to_apply()));
        tracing::debug!(sample_rate_hz, %config, "GainController2 created");

        Ok(Self {
            sample_rate_hz,
            fixed_gain_controller,
        })
    }

    /// Processes one 10 ms FloatS16 frame in place.
    pub fn process(&mut self, signal: &mut [&mut [f32]]) {
        self.fixed_gain_controller.process(signal);
    }

    pub fn gain_curve_stats(&self) -> GainCurveStats {
        self.fixed_gain_controller.gain_curve_stats()
    }

    pub fn sample_rate_hz(&self) -> usize {
        self.sample_rate_hz
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_audio_buffer_samples(value: f32, channels: &mut [Vec<f32>]) {
        for channel in channels {
            channel.fill(value);
        }
    }

    #[test]
    fn create_apply_config() {
        for sample_rate_hz in SUPPORTED_SAMPLE_RATES_HZ {
            let gc2 = GainController2::new(sample_rate_hz, &GainController2Config::default(), 0)
                .unwrap();
            assert_eq!(sample_rate_hz, gc2.sample_rate_hz());
            assert!(!gc2.gain_curve_stats().available);
        }
    }

    #[test]
    fn dumps_through_the_controller_instance() {
        for instance_index in [0, 7] {
            let gc2 =
                GainController2::new(16000, &GainController2Config::default(), instance_index)
                    .unwrap();
            assert_eq!(
                instance_index,
                gc2.fixed_gain_controller.apm_data_dumper().instance_index()
            );
        }
    }

    #[test]
    fn rejects_unsupported_sample_rate() {
        assert!(matches!(
            GainController2::new(44100, &GainController2Config::default(), 0),
            Err(Error::UnsupportedSampleRate(44100))
        ));
    }

    #[test]
    fn check_fixed_gain_config() {
        let mut config = GainController2Config::default();
        assert!(config.validate());
        config.fixed_gain_db = -5.0;
        assert!(!config.validate());
        config.fixed_gain_db = 49.9;
        assert!(config.validate());
        config.fixed_gain_db = 50.0;
        assert!(!config.validate());
        config.fixed_gain_db = f32::NAN;
        assert!(!config.validate());
        assert!(matches!(
            GainController2::new(48000, &config, 0),
            Err(Error::InvalidConfig)
        ));
    }

    #[test]
    fn config_to_string() {
        let config = GainController2Config {
            enabled: true,
            fixed_gain_db: 0.0,
        };
        assert_eq!("{enabled: true, fixed_gain_db: 0}", config.to_string());
        let config = GainController2Config {
            enabled: false,
            fixed_gain_db: 6.5,
        };
        assert_eq!("{enabled: false, fixed_gain_db: 6.5}", config.to_string());
    }

    #[test]
    fn fixed_gain_amplifies_and_limits() {
        const SAMPLE_RATE_HZ: usize = 16000;
        let config = GainController2Config {
            enabled: true,
            fixed_gain_db: 20.0,
        };
        let mut gc2 = GainController2::new(SAMPLE_RATE_HZ, &config, 1).unwrap();
        let mut channels = vec![vec![0.0_f32; SAMPLE_RATE_HZ / 100]; 2];

        // Quiet input is amplified by 20 dB, untouched by the limiter.
        set_audio_buffer_samples(100.0, &mut channels);
        let mut views: Vec<&mut [f32]> = channels.iter_mut().map(Vec::as_mut_slice).collect();
        gc2.process(&mut views);
        assert!(channels.iter().flatten().all(|&s| (s - 1000.0).abs() < 1e-2));

        // Loud input is brought back within full scale.
        for _ in 0..10 {
            set_audio_buffer_samples(30000.0, &mut channels);
            let mut views: Vec<&mut [f32]> =
                channels.iter_mut().map(Vec::as_mut_slice).collect();
            gc2.process(&mut views);
        }
        assert!(channels.iter().flatten().all(|&s| s <= 32767.0 && s > 30000.0));
        assert!(gc2.gain_curve_stats().look_ups_saturation_region > 0);
    }
}
