//! Peak envelope level estimator with attack/decay smoothing.

use crate::Error;
use crate::common::FRAME_DURATION_MS;
use crate::config::LevelEstimatorConfig;
use crate::data_dumper::ApmDataDumper;

/// Initial filter state level.
const INITIAL_FILTER_STATE_LEVEL: f32 = 0.0;

/// Per sub-frame smoothing coefficient for a time constant expressed as the
/// time to change the level by 1 dB. Zero means instant.
fn compute_filter_constant(sub_frame_duration_ms: f32, time_ms: f32) -> f32 {
    if time_ms == 0.0 {
        return 0.0;
    }
    10.0_f32.powf(-1.0 / 20.0).powf(sub_frame_duration_ms / time_ms)
}

fn check_time_constant(time_ms: f32) -> Result<f32, Error> {
    if time_ms.is_finite() && time_ms >= 0.0 {
        Ok(time_ms)
    } else {
        Err(Error::InvalidTimeConstant(time_ms))
    }
}

/// Produces a smooth signal level estimate from an input audio stream.
///
/// One estimate per sub-frame: the peak absolute sample over all channels,
/// pulled one sub-frame earlier when the next sub-frame is louder, then
/// smoothed with separate attack and decay one-pole filters.
#[derive(Debug)]
pub struct LevelEstimator {
    data_dumper: ApmDataDumper,
    num_sub_frames: usize,
    samples_in_frame: usize,
    samples_in_sub_frame: usize,
    attack_filter_constant: f32,
    decay_filter_constant: f32,
    filter_state_level: f32,
    envelope: Vec<f32>,
}

impl LevelEstimator {
    pub fn new(config: &LevelEstimatorConfig, data_dumper: ApmDataDumper) -> Result<Self, Error> {
        let sample_rate_hz = config.sample_rate_hz;
        let samples_in_frame = sample_rate_hz * FRAME_DURATION_MS / 1000;
        if samples_in_frame == 0 || samples_in_frame * 1000 != sample_rate_hz * FRAME_DURATION_MS {
            return Err(Error::FractionalFrameSize { sample_rate_hz });
        }

        let num_sub_frames = config.num_sub_frames;
        if num_sub_frames == 0 {
            return Err(Error::ZeroSubFrames);
        }
        if num_sub_frames > samples_in_frame {
            return Err(Error::TooManySubFrames {
                num_sub_frames,
                samples_in_frame,
            });
        }
        if samples_in_frame % num_sub_frames != 0 {
            return Err(Error::IndivisibleFrame {
                num_sub_frames,
                samples_in_frame,
            });
        }

        let attack_ms = check_time_constant(config.attack_ms)?;
        let decay_ms = check_time_constant(config.decay_ms)?;
        let sub_frame_duration_ms = FRAME_DURATION_MS as f32 / num_sub_frames as f32;

        Ok(Self {
            data_dumper,
            num_sub_frames,
            samples_in_frame,
            samples_in_sub_frame: samples_in_frame / num_sub_frames,
            attack_filter_constant: compute_filter_constant(sub_frame_duration_ms, attack_ms),
            decay_filter_constant: compute_filter_constant(sub_frame_duration_ms, decay_ms),
            filter_state_level: INITIAL_FILTER_STATE_LEVEL,
            envelope: vec![0.0; num_sub_frames],
        })
    }

    /// Computes the level envelope of a multi-channel FloatS16 frame.
    ///
    /// Returns one estimate per sub-frame. Panics if the frame has no channels
    /// or a channel does not hold exactly one frame of samples.
    pub fn compute_level<C: AsRef<[f32]>>(&mut self, frame: &[C]) -> &[f32] {
        assert!(!frame.is_empty(), "frame has no channels");
        for channel in frame {
            assert_eq!(
                self.samples_in_frame,
                channel.as_ref().len(),
                "channel length differs from the frame size"
            );
        }

        // Max envelope without smoothing.
        self.envelope.fill(0.0);
        for channel in frame {
            let sub_frames = channel.as_ref().chunks_exact(self.samples_in_sub_frame);
            for (env, sub_frame) in self.envelope.iter_mut().zip(sub_frames) {
                for &sample in sub_frame {
                    *env = env.max(sample.abs());
                }
                // Samples that overflowed to infinity must not poison the
                // filter state.
                *env = env.min(f32::MAX);
            }
        }

        // Envelope increases happen one step earlier so that the gain decrease
        // does not miss a sudden signal increase due to interpolation.
        if self.samples_in_sub_frame > 1 {
            for sub_frame in 0..self.num_sub_frames - 1 {
                if self.envelope[sub_frame] < self.envelope[sub_frame + 1] {
                    self.envelope[sub_frame] = self.envelope[sub_frame + 1];
                }
            }
        }

        for env in &mut self.envelope {
            let envelope_value = *env;
            let filter_constant = if envelope_value > self.filter_state_level {
                self.attack_filter_constant
            } else {
                self.decay_filter_constant
            };
            *env = (envelope_value * (1.0 - filter_constant)
                + self.filter_state_level * filter_constant)
                .min(f32::MAX);
            self.filter_state_level = *env;
        }

        self.data_dumper
            .dump_raw("agc2_level_estimator_envelope", &self.envelope);
        &self.envelope
    }

    pub fn num_sub_frames(&self) -> usize {
        self.num_sub_frames
    }

    pub fn samples_in_frame(&self) -> usize {
        self.samples_in_frame
    }

    /// Returns the last computed audio level.
    pub fn last_level(&self) -> f32 {
        self.filter_state_level
    }

    /// Resets the smoothing state.
    pub fn reset(&mut self) {
        self.filter_state_level = INITIAL_FILTER_STATE_LEVEL;
    }
}
