//! Property-based test support for the AGC2 fixed digital controller.
//!
//! Provides FloatS16 frame generators, level estimator setting generators and
//! assertions over processed frames.
//!
//! # Usage
//!
//! ```ignore
//! use webrtc_fixed_digital_proptest::generators::*;
//! use test_strategy::proptest;
//!
//! #[proptest]
//! fn my_test(frame: FloatS16Frame) {
//!     assert_eq!(frame.samples[0].len(), frame.sample_rate.frame_size());
//! }
//! ```

pub mod comparison;
pub mod generators;

pub use proptest;
pub use test_strategy;
