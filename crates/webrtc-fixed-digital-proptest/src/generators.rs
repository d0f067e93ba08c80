//! FloatS16 frame and limiter setting generators.
//!
//! Strategy functions are meant for `#[strategy(...)]`; the structs derive
//! `Arbitrary` for the common "frame at a supported rate" inputs.

use proptest::prelude::*;
use test_strategy::Arbitrary;

/// Lowest FloatS16 sample value.
pub const FLOAT_S16_MIN: f32 = -32768.0;
/// Highest FloatS16 sample value.
pub const FLOAT_S16_MAX: f32 = 32767.0;

/// A sample rate accepted by the gain controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum SampleRate {
    #[weight(1)]
    Hz8000,
    #[weight(1)]
    Hz16000,
    #[weight(1)]
    Hz32000,
    #[weight(1)]
    Hz48000,
}

impl SampleRate {
    pub const ALL: [Self; 4] = [Self::Hz8000, Self::Hz16000, Self::Hz32000, Self::Hz48000];

    pub fn hz(self) -> usize {
        match self {
            Self::Hz8000 => 8000,
            Self::Hz16000 => 16000,
            Self::Hz32000 => 32000,
            Self::Hz48000 => 48000,
        }
    }

    /// Number of samples per channel in a 10ms frame at this rate.
    pub fn frame_size(self) -> usize {
        self.hz() / 100
    }
}

/// Channel count of a generated frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum ChannelCount {
    #[weight(2)]
    Mono,
    #[weight(1)]
    Stereo,
    #[weight(1)]
    Many,
}

impl ChannelCount {
    pub fn count(self) -> usize {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
            Self::Many => 5,
        }
    }
}

/// A deinterleaved FloatS16 frame with its sample rate.
#[derive(Debug, Clone, Arbitrary)]
pub struct FloatS16Frame {
    pub sample_rate: SampleRate,
    pub channels: ChannelCount,
    #[strategy(float_s16_frame(#sample_rate.frame_size(), #channels.count()))]
    pub samples: Vec<Vec<f32>>,
}

impl FloatS16Frame {
    /// Mutable channel views as taken by the processing entry points.
    pub fn as_mut_channels(&mut self) -> Vec<&mut [f32]> {
        self.samples.iter_mut().map(Vec::as_mut_slice).collect()
    }
}

/// Level estimator settings valid for a given sample rate.
#[derive(Debug, Clone, Copy, Arbitrary)]
pub struct LevelEstimatorSettings {
    pub sample_rate: SampleRate,
    #[strategy(sub_frame_count(#sample_rate.frame_size()))]
    pub num_sub_frames: usize,
    #[strategy(time_constant_ms())]
    pub attack_ms: f32,
    #[strategy(time_constant_ms())]
    pub decay_ms: f32,
}

/// One channel of FloatS16 samples.
pub fn float_s16_channel(samples_per_channel: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(
        FLOAT_S16_MIN..=FLOAT_S16_MAX,
        samples_per_channel..=samples_per_channel,
    )
}

/// `num_channels` channels of FloatS16 samples of equal length.
pub fn float_s16_frame(
    samples_per_channel: usize,
    num_channels: usize,
) -> impl Strategy<Value = Vec<Vec<f32>>> {
    proptest::collection::vec(
        float_s16_channel(samples_per_channel),
        num_channels..=num_channels,
    )
}

/// A frame whose samples all share one value drawn from `levels`.
pub fn constant_frame(
    samples_per_channel: usize,
    num_channels: usize,
    levels: std::ops::RangeInclusive<f32>,
) -> impl Strategy<Value = Vec<Vec<f32>>> {
    levels.prop_map(move |level| vec![vec![level; samples_per_channel]; num_channels])
}

/// A divisor of `samples_in_frame`, i.e. a sub-frame count the level
/// estimator accepts.
pub fn sub_frame_count(samples_in_frame: usize) -> impl Strategy<Value = usize> {
    let divisors: Vec<usize> = (1..=samples_in_frame)
        .filter(|n| samples_in_frame % n == 0)
        .collect();
    proptest::sample::select(divisors)
}

/// Attack or decay time, including the instant (0 ms) case.
pub fn time_constant_ms() -> impl Strategy<Value = f32> {
    prop_oneof![Just(0.0f32), 0.01f32..200.0f32]
}

/// Fixed gains spanning attenuation to heavy amplification.
pub fn gain_db() -> impl Strategy<Value = f32> {
    -20.0f32..=40.0f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::proptest;

    #[proptest]
    fn channel_correct_length(#[strategy(float_s16_channel(160))] channel: Vec<f32>) {
        assert_eq!(channel.len(), 160);
        for &s in &channel {
            assert!((FLOAT_S16_MIN..=FLOAT_S16_MAX).contains(&s));
        }
    }

    #[proptest]
    fn frame_struct_consistent(frame: FloatS16Frame) {
        assert_eq!(frame.samples.len(), frame.channels.count());
        for channel in &frame.samples {
            assert_eq!(channel.len(), frame.sample_rate.frame_size());
        }
    }

    #[proptest]
    fn constant_frame_is_constant(
        #[strategy(constant_frame(480, 2, -100.0..=100.0))] frame: Vec<Vec<f32>>,
    ) {
        assert_eq!(frame.len(), 2);
        let first = frame[0][0];
        assert!(frame.iter().flatten().all(|&s| s == first));
    }

    #[proptest]
    fn sub_frame_count_divides_frame(settings: LevelEstimatorSettings) {
        let samples_in_frame = settings.sample_rate.frame_size();
        assert!(settings.num_sub_frames >= 1);
        assert_eq!(samples_in_frame % settings.num_sub_frames, 0);
        assert!(settings.attack_ms >= 0.0);
        assert!(settings.decay_ms >= 0.0);
    }

    #[proptest]
    fn sample_rate_valid_values(sr: SampleRate) {
        assert!(SampleRate::ALL.contains(&sr));
        assert_eq!(sr.hz() % 100, 0);
    }
}
