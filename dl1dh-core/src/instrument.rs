//! Instrument description: cameras, optics, telescopes and the subarray.

use crate::error::{Error, Result};
use crate::units::{Meters, Position};
use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Telescope identifier as stored in `/Array_Information`.
pub type TelescopeId = u32;

/// Camera hardware description.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CameraDescription {
    /// Camera name (e.g. `LSTCam`).
    pub name: String,
    /// Number of pixels.
    pub num_pixels: usize,
    /// Number of readout gain channels.
    pub num_gains: usize,
}

/// Optics (mirror) description.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OpticsDescription {
    /// Optics name (e.g. `LST`).
    pub name: String,
    /// Effective mirror area in m².
    pub mirror_area_m2: f64,
    /// Equivalent focal length.
    pub equivalent_focal_length: Meters,
    /// Number of mirror facets.
    pub num_mirror_tiles: u32,
}

/// Name-based lookup of camera and optics descriptions.
///
/// The reader depends on this trait rather than a fixed table so callers can
/// inject their own instrument database.
pub trait InstrumentRegistry: Send + Sync {
    /// Resolve a camera name.
    ///
    /// # Errors
    /// Returns [`Error::UnknownCamera`] if the name is not known.
    fn camera(&self, name: &str) -> Result<CameraDescription>;

    /// Resolve an optics name.
    ///
    /// # Errors
    /// Returns [`Error::UnknownOptics`] if the name is not known.
    fn optics(&self, name: &str) -> Result<OpticsDescription>;
}

// (name, pixels, gains)
const CAMERAS: &[(&str, usize, usize)] = &[
    ("ASTRICam", 2368, 2),
    ("CHEC", 2048, 2),
    ("DigiCam", 1296, 1),
    ("FACT", 1440, 1),
    ("FlashCam", 1764, 2),
    ("HESS-I", 960, 2),
    ("HESS-II", 2048, 2),
    ("LSTCam", 1855, 2),
    ("MAGICCam", 1039, 1),
    ("NectarCam", 1855, 2),
    ("SCTCam", 11328, 1),
    ("VERITAS", 499, 1),
];

// (name, mirror area m², focal length m, tiles)
const OPTICS: &[(&str, f64, f64, u32)] = &[
    ("ASTRI", 14.56, 2.15, 2),
    ("LST", 386.73, 28.0, 198),
    ("MST", 103.83, 16.0, 86),
    ("MST-SCT", 40.74, 5.59, 2),
    ("SST-1M", 9.42, 5.6, 18),
    ("SST-ASTRI", 14.56, 2.15, 2),
    ("SST-GCT", 6.47, 2.28, 2),
];

/// Built-in registry with nominal CTA and current-generation IACT hardware.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinRegistry;

impl InstrumentRegistry for BuiltinRegistry {
    fn camera(&self, name: &str) -> Result<CameraDescription> {
        CAMERAS
            .iter()
            .find(|(known, _, _)| *known == name)
            .map(|&(known, num_pixels, num_gains)| CameraDescription {
                name: known.to_string(),
                num_pixels,
                num_gains,
            })
            .ok_or_else(|| Error::UnknownCamera(name.to_string()))
    }

    fn optics(&self, name: &str) -> Result<OpticsDescription> {
        OPTICS
            .iter()
            .find(|(known, _, _, _)| *known == name)
            .map(|&(known, area, focal, tiles)| OpticsDescription {
                name: known.to_string(),
                mirror_area_m2: area,
                equivalent_focal_length: Meters(focal),
                num_mirror_tiles: tiles,
            })
            .ok_or_else(|| Error::UnknownOptics(name.to_string()))
    }
}

/// A single telescope of the subarray.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TelescopeDescription {
    pub id: TelescopeId,
    /// Type tag shared by all telescopes with identical hardware.
    pub tel_type: String,
    pub position: Position,
    pub camera_name: String,
    pub optics_name: String,
    /// Resolved camera, `None` if the registry does not know the name.
    pub camera: Option<CameraDescription>,
    /// Resolved optics, `None` if the registry does not know the name.
    pub optics: Option<OpticsDescription>,
}

impl TelescopeDescription {
    /// Builds a description, resolving camera and optics through `registry`.
    ///
    /// Resolution failures do not abort: the description keeps the bare
    /// names and the failures are returned for the caller to report.
    pub fn from_names(
        id: TelescopeId,
        tel_type: &str,
        position: Position,
        optics_name: &str,
        camera_name: &str,
        registry: &dyn InstrumentRegistry,
    ) -> (Self, Vec<Error>) {
        let mut misses = Vec::new();
        let camera = registry
            .camera(camera_name)
            .map_err(|e| misses.push(e))
            .ok();
        let optics = registry
            .optics(optics_name)
            .map_err(|e| misses.push(e))
            .ok();

        let description = Self {
            id,
            tel_type: tel_type.to_string(),
            position,
            camera_name: camera_name.to_string(),
            optics_name: optics_name.to_string(),
            camera,
            optics,
        };
        (description, misses)
    }

    /// Pixel count, if the camera was resolved.
    #[must_use]
    pub fn num_pixels(&self) -> Option<usize> {
        self.camera.as_ref().map(|c| c.num_pixels)
    }
}

impl fmt::Display for TelescopeDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.optics_name, self.camera_name)
    }
}

/// The set of telescopes and their positions for one file.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SubarrayDescription {
    pub name: String,
    tels: BTreeMap<TelescopeId, TelescopeDescription>,
}

impl SubarrayDescription {
    /// Creates an empty subarray.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tels: BTreeMap::new(),
        }
    }

    /// Adds a telescope.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateTelescope`] if the id is already present.
    pub fn insert(&mut self, tel: TelescopeDescription) -> Result<()> {
        if self.tels.contains_key(&tel.id) {
            return Err(Error::DuplicateTelescope(tel.id));
        }
        self.tels.insert(tel.id, tel);
        Ok(())
    }

    #[must_use]
    pub fn tel(&self, id: TelescopeId) -> Option<&TelescopeDescription> {
        self.tels.get(&id)
    }

    #[must_use]
    pub fn position(&self, id: TelescopeId) -> Option<Position> {
        self.tels.get(&id).map(|t| t.position)
    }

    /// Returns true if `id` is part of the subarray.
    #[must_use]
    pub fn contains(&self, id: TelescopeId) -> bool {
        self.tels.contains_key(&id)
    }

    #[must_use]
    pub fn num_tels(&self) -> usize {
        self.tels.len()
    }

    /// Telescope ids in ascending order.
    pub fn tel_ids(&self) -> impl Iterator<Item = TelescopeId> + '_ {
        self.tels.keys().copied()
    }

    /// All telescopes in ascending id order.
    pub fn tels(&self) -> impl Iterator<Item = &TelescopeDescription> {
        self.tels.values()
    }

    /// Distinct type tags, sorted.
    #[must_use]
    pub fn tel_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.tels.values().map(|t| t.tel_type.as_str()).collect();
        types.sort_unstable();
        types.dedup();
        types
    }

    /// Ids of all telescopes of one type, ascending.
    #[must_use]
    pub fn tel_ids_for_type(&self, tel_type: &str) -> Vec<TelescopeId> {
        self.tels
            .values()
            .filter(|t| t.tel_type == tel_type)
            .map(|t| t.id)
            .collect()
    }
}
