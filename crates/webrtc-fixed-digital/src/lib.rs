//! Fixed digital gain controller of Automatic Gain Control 2 (AGC2).
//!
//! Applies a fixed gain to multi-channel FloatS16 frames, then a limiter that
//! follows a smooth compression curve approximated by a piecewise-linear
//! table, and finally hard-clips to the 16-bit range.

pub mod common;
pub mod config;
pub mod data_dumper;
pub mod error;
pub mod fixed_gain_controller;
pub mod gain_controller2;
pub mod gain_curve_applier;
pub mod interpolated_gain_curve;
pub mod level_estimator;
pub mod limiter_db_gain_curve;

pub use config::{
    ApproximationPoints, FixedDigitalConfig, LevelEstimatorConfig, LimiterCurveParams,
};
pub use error::Error;
pub use fixed_gain_controller::FixedGainController;
pub use gain_controller2::{GainController2, GainController2Config};
pub use interpolated_gain_curve::GainCurveStats;
