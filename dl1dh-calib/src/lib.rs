//! dl1dh-calib: Gain channel selection for multi-gain cameras.
//!
//! Cameras with two readout paths per pixel record a high-gain and a
//! low-gain signal. This crate picks, pixel by pixel, which of the two ends
//! up in the single-channel DL1 image:
//! - **combine** - threshold test on channel 0, one output value per pixel
//! - **selector** - per-camera thresholds and multi-telescope batching
//!
#![warn(missing_docs)]

mod combine;
mod error;
mod selector;

pub use combine::{
    combine_channels, CombinedImage, MultiGainImage, SelectionMode, HIGH_GAIN, LOW_GAIN,
};
pub use error::{GainError, Result};
pub use selector::{GainSelector, DEFAULT_THRESHOLD};
