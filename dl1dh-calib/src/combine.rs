//! Threshold-based gain channel combination.
//!
//! A multi-gain camera reads every pixel through a high-gain (channel 0) and
//! a low-gain (channel 1) path. The high-gain path is used unless its signal
//! reaches the threshold, in which case the pixel is taken from the
//! low-gain path.

use crate::error::{GainError, Result};
use ndarray::{Array1, Array2, Array3, ArrayView2, ArrayView3, Axis};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Channel index of the high-gain path.
pub const HIGH_GAIN: u8 = 0;
/// Channel index of the low-gain path.
pub const LOW_GAIN: u8 = 1;

/// Which channel-0 quantity is compared against the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SelectionMode {
    /// Maximum sample of the channel-0 waveform.
    #[default]
    PeakSample,
    /// Channel-0 image value.
    Image,
}

/// Multi-gain data of one telescope.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiGainImage {
    /// Shape (channels, pixels, samples).
    pub waveform: Array3<f32>,
    /// Shape (channels, pixels).
    pub image: Array2<f32>,
    /// Shape (channels, pixels).
    pub peak_time: Array2<f32>,
}

impl MultiGainImage {
    /// Number of gain channels.
    #[must_use]
    pub fn num_channels(&self) -> usize {
        self.waveform.len_of(Axis(0))
    }

    /// Number of pixels.
    #[must_use]
    pub fn num_pixels(&self) -> usize {
        self.waveform.len_of(Axis(1))
    }

    /// Combines the channels of this telescope.
    ///
    /// # Errors
    /// See [`combine_channels`].
    pub fn combine(
        &self,
        camera: &str,
        threshold: f32,
        mode: SelectionMode,
    ) -> Result<CombinedImage> {
        combine_channels(
            self.waveform.view(),
            self.image.view(),
            self.peak_time.view(),
            camera,
            threshold,
            mode,
        )
    }
}

/// Single-channel result of gain combination.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedImage {
    /// One value per pixel.
    pub image: Array1<f32>,
    /// One value per pixel.
    pub peak_time: Array1<f32>,
    /// Channel each pixel was taken from.
    pub selected_channel: Array1<u8>,
}

impl CombinedImage {
    /// Number of pixels.
    #[must_use]
    pub fn num_pixels(&self) -> usize {
        self.image.len()
    }

    /// Number of pixels taken from the low-gain channel.
    #[must_use]
    pub fn num_low_gain(&self) -> usize {
        self.selected_channel
            .iter()
            .filter(|&&c| c == LOW_GAIN)
            .count()
    }
}

/// Selects, per pixel, one gain channel and returns the combined image and
/// peak time.
///
/// A pixel keeps the high-gain value when its channel-0 amplitude (chosen by
/// `mode`) is strictly below `threshold`; otherwise, including a NaN
/// amplitude, the low-gain value is used. Single-channel input is passed
/// through unchanged.
///
/// # Errors
/// Returns [`GainError::UnsupportedChannelCount`] for more than two channels
/// (or none) and [`GainError::ShapeMismatch`] if `image` or `peak_time` do
/// not match the waveform's (channels, pixels).
pub fn combine_channels(
    waveform: ArrayView3<'_, f32>,
    image: ArrayView2<'_, f32>,
    peak_time: ArrayView2<'_, f32>,
    camera: &str,
    threshold: f32,
    mode: SelectionMode,
) -> Result<CombinedImage> {
    let (channels, pixels, _samples) = waveform.dim();
    check_shape(camera, "image", (channels, pixels), image.dim())?;
    check_shape(camera, "peak_time", (channels, pixels), peak_time.dim())?;

    match channels {
        1 => {
            return Ok(CombinedImage {
                image: image.row(0).to_owned(),
                peak_time: peak_time.row(0).to_owned(),
                selected_channel: Array1::from_elem(pixels, HIGH_GAIN),
            })
        }
        2 => {}
        _ => {
            return Err(GainError::UnsupportedChannelCount {
                camera: camera.to_string(),
                channels,
            })
        }
    }

    let amplitude = match mode {
        SelectionMode::PeakSample => waveform
            .index_axis(Axis(0), 0)
            .map_axis(Axis(1), |samples| {
                // f32::max drops NaN; keep it so the pixel goes to low gain.
                samples.fold(f32::NEG_INFINITY, |acc, &v| {
                    if acc.is_nan() || v.is_nan() {
                        f32::NAN
                    } else {
                        acc.max(v)
                    }
                })
            }),
        SelectionMode::Image => image.row(0).to_owned(),
    };

    let selected_channel = amplitude.mapv(|amp| if amp < threshold { HIGH_GAIN } else { LOW_GAIN });

    let mut combined_image = Array1::zeros(pixels);
    let mut combined_peak_time = Array1::zeros(pixels);
    for (pixel, &channel) in selected_channel.iter().enumerate() {
        let channel = usize::from(channel);
        combined_image[pixel] = image[[channel, pixel]];
        combined_peak_time[pixel] = peak_time[[channel, pixel]];
    }

    Ok(CombinedImage {
        image: combined_image,
        peak_time: combined_peak_time,
        selected_channel,
    })
}

fn check_shape(
    camera: &str,
    array: &'static str,
    expected: (usize, usize),
    found: (usize, usize),
) -> Result<()> {
    if expected == found {
        return Ok(());
    }
    Err(GainError::ShapeMismatch {
        camera: camera.to_string(),
        array,
        expected,
        found,
    })
}
