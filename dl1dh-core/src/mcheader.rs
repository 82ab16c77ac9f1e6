//! Simulation run header.

use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Keys the run header is populated from, in file-attribute naming.
pub const MC_HEADER_KEYS: &[&str] = &[
    "run_array_direction",
    "corsika_version",
    "simtel_version",
    "energy_range_min",
    "energy_range_max",
    "prod_site_B_total",
    "prod_site_B_declination",
    "prod_site_B_inclination",
    "prod_site_alt",
    "spectral_index",
    "shower_prog_start",
    "shower_prog_id",
    "detector_prog_start",
    "detector_prog_id",
    "num_showers",
    "shower_reuse",
    "max_alt",
    "min_alt",
    "max_az",
    "min_az",
    "diffuse",
    "max_viewcone_radius",
    "min_viewcone_radius",
    "max_scatter_range",
    "min_scatter_range",
    "core_pos_mode",
    "injection_height",
    "atmosphere",
    "corsika_iact_options",
    "corsika_low_E_model",
    "corsika_high_E_model",
    "corsika_bunchsize",
    "corsika_wlen_min",
    "corsika_wlen_max",
    "corsika_low_E_detail",
    "corsika_high_E_detail",
];

/// A single header value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(untagged))]
pub enum HeaderValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Vector(Vec<f64>),
}

impl HeaderValue {
    /// Numeric view of scalar values.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Bool(_) | Self::Text(_) | Self::Vector(_) => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
            Self::Vector(v) => write!(f, "{v:?}"),
        }
    }
}

/// Run-level simulation configuration.
///
/// Only keys from [`MC_HEADER_KEYS`] are accepted; keys missing from the
/// file stay unset.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct McHeader {
    values: BTreeMap<String, HeaderValue>,
}

impl McHeader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a value. Returns `false` (and stores nothing) for unknown keys.
    pub fn set(&mut self, key: &str, value: HeaderValue) -> bool {
        if !MC_HEADER_KEYS.contains(&key) {
            return false;
        }
        self.values.insert(key.to_string(), value);
        true
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.values.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keys of [`MC_HEADER_KEYS`] that have no value.
    pub fn missing_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        MC_HEADER_KEYS
            .iter()
            .copied()
            .filter(|k| !self.values.contains_key(*k))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Array pointing direction `(az, alt)` in radians, if present.
    #[must_use]
    pub fn run_array_direction(&self) -> Option<(f64, f64)> {
        match self.values.get("run_array_direction") {
            Some(HeaderValue::Vector(v)) if v.len() == 2 => Some((v[0], v[1])),
            _ => None,
        }
    }
}
