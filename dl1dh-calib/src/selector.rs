//! Per-camera gain selection configuration.

use crate::combine::{CombinedImage, MultiGainImage, SelectionMode};
use crate::error::Result;
use dl1dh_core::TelescopeId;
use rayon::prelude::*;
use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// High-gain saturation level of a 12-bit digitizer, in ADC counts.
pub const DEFAULT_THRESHOLD: f32 = 4000.0;

/// Threshold gain selector with per-camera overrides.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GainSelector {
    /// Threshold for cameras without an override.
    pub default_threshold: f32,
    /// Camera name → threshold.
    pub thresholds: HashMap<String, f32>,
    /// Channel-0 quantity compared against the threshold.
    pub mode: SelectionMode,
}

impl Default for GainSelector {
    fn default() -> Self {
        Self {
            default_threshold: DEFAULT_THRESHOLD,
            thresholds: HashMap::new(),
            mode: SelectionMode::default(),
        }
    }
}

impl GainSelector {
    /// Create a selector with one threshold for every camera.
    #[must_use]
    pub fn new(default_threshold: f32) -> Self {
        Self {
            default_threshold,
            ..Self::default()
        }
    }

    /// Override the threshold of one camera.
    #[must_use]
    pub fn with_threshold(mut self, camera: impl Into<String>, threshold: f32) -> Self {
        self.thresholds.insert(camera.into(), threshold);
        self
    }

    /// Set the amplitude the threshold is compared to.
    #[must_use]
    pub fn with_mode(mut self, mode: SelectionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Threshold applied to `camera`.
    #[must_use]
    pub fn threshold_for(&self, camera: &str) -> f32 {
        self.thresholds
            .get(camera)
            .copied()
            .unwrap_or(self.default_threshold)
    }

    /// Combine the channels of one telescope.
    ///
    /// # Errors
    /// Returns an error if the channel count is unsupported or shapes mismatch.
    pub fn combine(&self, camera: &str, data: &MultiGainImage) -> Result<CombinedImage> {
        data.combine(camera, self.threshold_for(camera), self.mode)
    }

    /// Combine many telescopes in parallel, preserving input order.
    ///
    /// # Errors
    /// Returns the first error encountered.
    pub fn combine_all(
        &self,
        tels: &[(TelescopeId, &str, &MultiGainImage)],
    ) -> Result<Vec<(TelescopeId, CombinedImage)>> {
        tels.par_iter()
            .map(|&(tel_id, camera, data)| {
                let combined = self.combine(camera, data)?;
                log::debug!(
                    "tel {tel_id} ({camera}): {} of {} pixels from low gain",
                    combined.num_low_gain(),
                    combined.num_pixels()
                );
                Ok((tel_id, combined))
            })
            .collect()
    }
}
