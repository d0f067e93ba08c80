//! Construction errors.
//!
//! Every configuration problem is detected when a component is built; the
//! per-frame path has no recoverable errors.

/// Errors returned when building a controller or one of its components.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum Error {
    /// The level estimator needs at least one sub-frame.
    #[error("number of sub-frames must be positive")]
    ZeroSubFrames,
    /// More sub-frames than samples in a frame.
    #[error("{num_sub_frames} sub-frames exceed the {samples_in_frame} samples in a frame")]
    TooManySubFrames {
        num_sub_frames: usize,
        samples_in_frame: usize,
    },
    /// The frame cannot be split into sub-frames of equal length.
    #[error("{samples_in_frame} samples cannot be split into {num_sub_frames} equal sub-frames")]
    IndivisibleFrame {
        num_sub_frames: usize,
        samples_in_frame: usize,
    },
    /// The sample rate does not give a whole number of samples per frame.
    #[error("sample rate {sample_rate_hz} Hz does not give a whole number of samples per frame")]
    FractionalFrameSize { sample_rate_hz: usize },
    /// Attack or decay time is negative or not finite.
    #[error("attack/decay time must be finite and non-negative, got {0} ms")]
    InvalidTimeConstant(f32),
    /// The linear gain derived from the configured dB gain is not usable.
    #[error("gain of {gain_db} dB does not map to a positive finite linear gain")]
    InvalidGain { gain_db: f32 },
    /// Knee smoothness must be positive.
    #[error("knee smoothness must be positive, got {0} dB")]
    InvalidKneeSmoothness(f64),
    /// Compression ratio must be greater than one.
    #[error("compression ratio must be greater than 1, got {0}")]
    InvalidCompressionRatio(f64),
    /// The knee does not lie strictly between the lowest representable level
    /// and the maximum input level.
    #[error(
        "knee region [{knee_start_dbfs}, {limiter_start_dbfs}] dBFS must start above the minimum level and end below the max input level {max_input_level_db} dBFS"
    )]
    InvalidKneeRegion {
        knee_start_dbfs: f64,
        limiter_start_dbfs: f64,
        max_input_level_db: f64,
    },
    /// Too few interpolation points for a region of the gain curve.
    #[error("{region} region needs more than 2 interpolation points, got {points}")]
    TooFewApproximationPoints { region: &'static str, points: usize },
    /// The approximation of the gain curve is not usable with the configured
    /// curve and number of points.
    #[error("gain curve approximation is degenerate at piece {piece}")]
    DegenerateApproximation { piece: usize },
    /// Sample rate not supported by the host adapter.
    #[error("unsupported sample rate {0} Hz")]
    UnsupportedSampleRate(usize),
    /// Host adapter configuration failed validation.
    #[error("invalid gain controller configuration")]
    InvalidConfig,
}
