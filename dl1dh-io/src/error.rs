//! I/O error types.

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HDF5 library error (missing group, dataset or attribute included).
    #[cfg(feature = "hdf5")]
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),

    /// A required library is not available in this build.
    #[error("missing dependency: {0}")]
    Dependency(String),

    /// Invalid file format.
    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    /// No registered event source with this name.
    #[error("unknown event source: {0}")]
    UnknownSource(String),

    /// No registered event source accepts the file.
    #[error("no compatible event source for {0}")]
    NoCompatibleSource(String),

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] dl1dh_core::Error),

    /// Gain selection error.
    #[error("gain selection error: {0}")]
    GainError(#[from] dl1dh_calib::GainError),
}
