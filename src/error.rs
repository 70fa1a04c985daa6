//! Error type shared by all conversion routines.

use thiserror::Error;

use crate::buffer::LockMode;
use crate::image::{PixelFormat, Resolution};

/// Reasons a conversion can fail.
///
/// Every failure is local to the call that produced it. No routine retries internally, and no
/// state outside of the failed call is left modified.
#[derive(Error, Debug)]
pub enum Error {
    /// Storage for a buffer, image, or tensor could not be reserved.
    #[error("failed to allocate {bytes} bytes for {what}")]
    Allocation { what: &'static str, bytes: usize },

    /// A width or height was zero, or the byte size computation overflowed.
    #[error("invalid dimensions {0}")]
    InvalidDimensions(Resolution),

    /// The pixel format cannot be used for the requested operation.
    #[error("unsupported pixel format {format:?}: {reason}")]
    UnsupportedFormat {
        format: PixelFormat,
        reason: &'static str,
    },

    /// A parameter does not agree with the data it describes (channel counts, byte lengths, tensor
    /// sizes).
    #[error("parameter mismatch for {name}: expected {expected}, got {actual}")]
    Mismatch {
        name: &'static str,
        expected: String,
        actual: String,
    },

    /// A pixel buffer is already locked in a conflicting mode.
    #[error("failed to lock pixel buffer for {0} access")]
    Lock(LockMode),

    /// A chunk grid cannot be reassembled.
    #[error("invalid chunk grid: {0}")]
    InvalidGrid(String),
}

impl Error {
    pub(crate) fn mismatch(
        name: &'static str,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        Self::Mismatch {
            name,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Emits this error on the log channel and returns it, for use in `return Err(...)` and
    /// `map_err` positions.
    pub(crate) fn logged(self) -> Self {
        log::warn!("{self}");
        self
    }
}

/// Result type alias for fallible pixbridge operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
