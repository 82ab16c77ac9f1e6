//! Event records produced by an event source.

use crate::error::{Error, Result};
use crate::instrument::{SubarrayDescription, TelescopeId};
use crate::mcheader::McHeader;
use crate::units::{GramsPerSquareCm, Meters, Radians, TeV};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Simulated air-shower truth.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct McShower {
    pub energy: TeV,
    pub alt: Radians,
    pub az: Radians,
    pub core_x: Meters,
    pub core_y: Meters,
    /// Height of first interaction.
    pub h_first_int: Meters,
    /// Depth of shower maximum.
    pub x_max: GramsPerSquareCm,
    /// CORSIKA particle id (0 = gamma, 1 = electron, 101 = proton, ...).
    pub shower_primary_id: u32,
}

/// Calibrated image of one telescope.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TelescopeImage {
    /// Integrated charge per pixel.
    pub image: Vec<f32>,
    /// Pulse peak time per pixel.
    pub pulse_time: Vec<f32>,
}

impl TelescopeImage {
    /// Builds an image, checking that both arrays cover the same pixels.
    ///
    /// # Errors
    /// Returns [`Error::PixelCountMismatch`] if the lengths differ.
    pub fn new(tel_id: TelescopeId, image: Vec<f32>, pulse_time: Vec<f32>) -> Result<Self> {
        if image.len() != pulse_time.len() {
            return Err(Error::PixelCountMismatch {
                tel_id,
                image: image.len(),
                pulse_time: pulse_time.len(),
            });
        }
        Ok(Self { image, pulse_time })
    }

    #[must_use]
    pub fn num_pixels(&self) -> usize {
        self.image.len()
    }

    /// Sum of all pixel charges.
    #[must_use]
    pub fn total_charge(&self) -> f64 {
        self.image.iter().map(|&v| f64::from(v)).sum()
    }
}

/// Provenance of the events of one source.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SourceMeta {
    pub origin: String,
    pub input_url: String,
    pub max_events: Option<usize>,
    pub is_simulation: bool,
}

/// One simulated array event.
#[derive(Debug, Clone)]
pub struct ArrayEvent {
    /// Position of this event in the yielded sequence.
    pub count: usize,
    pub obs_id: u64,
    pub event_id: u64,
    /// Telescopes with data, after any telescope filter.
    pub tels_with_data: BTreeSet<TelescopeId>,
    pub mc: McShower,
    pub mcheader: Arc<McHeader>,
    /// Calibrated images keyed by telescope id.
    pub dl1: BTreeMap<TelescopeId, TelescopeImage>,
    /// Shared by all events of the same file.
    pub subarray: Arc<SubarrayDescription>,
    pub meta: Arc<SourceMeta>,
}

impl ArrayEvent {
    #[must_use]
    pub fn num_tels(&self) -> usize {
        self.tels_with_data.len()
    }

    #[must_use]
    pub fn image(&self, tel_id: TelescopeId) -> Option<&TelescopeImage> {
        self.dl1.get(&tel_id)
    }
}
