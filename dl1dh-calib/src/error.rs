//! Gain selection error types.

use thiserror::Error;

/// Result type for gain selection.
pub type Result<T> = std::result::Result<T, GainError>;

/// Gain selection errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GainError {
    /// Only one or two readout channels have a defined selection policy.
    #[error("{camera}: unsupported number of gain channels: {channels} (expected 1 or 2)")]
    UnsupportedChannelCount {
        /// Camera the image belongs to.
        camera: String,
        /// Number of channels found.
        channels: usize,
    },

    /// Input arrays disagree on channel or pixel count.
    #[error("{camera}: {array} has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        /// Camera the image belongs to.
        camera: String,
        /// Which input array, `"image"` or `"peak_time"`.
        array: &'static str,
        /// `(channels, pixels)` taken from the waveform.
        expected: (usize, usize),
        /// Actual `(channels, pixels)` of `array`.
        found: (usize, usize),
    },
}
