//! dl1dh-core: Core types for DL1 telescope event data.
//!
//! This crate provides the instrument description (telescopes, subarray,
//! camera/optics registry), the simulated event record, the run header and
//! unit-tagged quantities shared by the reader and the writer.
//!

pub mod error;
pub mod event;
pub mod instrument;
pub mod mcheader;
pub mod units;

pub use error::{Error, Result};
pub use event::{ArrayEvent, McShower, SourceMeta, TelescopeImage};
pub use instrument::{
    BuiltinRegistry, CameraDescription, InstrumentRegistry, OpticsDescription,
    SubarrayDescription, TelescopeDescription, TelescopeId,
};
pub use mcheader::{HeaderValue, McHeader, MC_HEADER_KEYS};
pub use units::{GramsPerSquareCm, Meters, Position, Quantity, Radians, TeV};
