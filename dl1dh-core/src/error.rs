//! Error types for dl1dh-core.

use thiserror::Error;

/// Result type alias for dl1dh operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for dl1dh operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Camera name not known to the instrument registry.
    #[error("unknown camera name: {0}")]
    UnknownCamera(String),

    /// Optics name not known to the instrument registry.
    #[error("unknown optics name: {0}")]
    UnknownOptics(String),

    /// Telescope id not present in the subarray.
    #[error("telescope {0} is not part of the subarray")]
    UnknownTelescope(u32),

    /// Telescope id registered twice in the same subarray.
    #[error("telescope {0} is already part of the subarray")]
    DuplicateTelescope(u32),

    /// Image and pulse-time arrays disagree on the pixel count.
    #[error("telescope {tel_id}: image has {image} pixels but pulse time has {pulse_time}")]
    PixelCountMismatch {
        tel_id: u32,
        image: usize,
        pulse_time: usize,
    },
}
