//! dl1dh-io: HDF5 reading and writing of DL1 data handler files.
//!
//! This crate provides a lazy event source over DL1 files, a streaming
//! writer that applies gain selection, and a registry of event sources.
//! HDF5 support sits behind the `hdf5` feature (enabled by default).
//!

mod config;
mod error;
#[cfg(feature = "hdf5")]
mod hdf5;
mod registry;
mod session;
#[cfg(feature = "hdf5")]
mod source;
#[cfg(feature = "hdf5")]
mod writer;

pub use config::SourceConfig;
pub use error::{Error, Result};
pub use registry::{EventStream, SourceEntry, SourceRegistry, DL1DH_SOURCE};
pub use session::ReaderSession;
#[cfg(feature = "hdf5")]
pub use source::{Dl1EventSource, ORIGIN, SUBARRAY_NAME};
#[cfg(feature = "hdf5")]
pub use writer::{CalibratedEvent, Dl1Writer, WriterOptions};

/// Checks that this build can read DL1 files.
///
/// # Errors
/// Returns [`Error::Dependency`] when built without the `hdf5` feature.
pub fn require_hdf5() -> Result<()> {
    if cfg!(feature = "hdf5") {
        Ok(())
    } else {
        log::error!("dl1dh-io was built without HDF5 support; enable the `hdf5` feature");
        Err(Error::Dependency(
            "HDF5 support (build dl1dh-io with the `hdf5` feature)".to_string(),
        ))
    }
}
