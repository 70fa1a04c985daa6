//! Conversions between images, lockable pixel buffers, and neural network tensors.
//!
//! The crate is organized around three representations of pixel data:
//!
//! * [`Image`][image::Image]: an immutable raster with a [`PixelFormat`][image::PixelFormat],
//!   row stride, display scale and EXIF-style [`Orientation`][image::Orientation] tag.
//! * [`PixelBuffer`][buffer::PixelBuffer]: lockable, possibly planar pixel storage that can be
//!   allocated with GPU-friendly row alignment.
//! * [`Tensor`][nn::Tensor]: a dense, row-major N-dimensional array used as neural network input
//!   and output.
//!
//! [`nn::encode`] and [`nn::decode`] convert between images and planar `[N, C, H, W]` tensors,
//! [`transform`] resizes, rotates and uprights images, and [`chunk`] tiles them. Every routine
//! takes its inputs by reference and returns a newly allocated output.
//!
//! # Environment Variables
//!
//! * `PIXBRIDGE_RESAMPLE_FILTER`: filter used by [`transform::resized`] and
//!   [`transform::resized_to`]. One of `nearest`, `triangle` (the default), `catmull-rom`,
//!   `gaussian` or `lanczos3`.
//! * `PIXBRIDGE_SHAREABLE_BUFFERS`: set to `off` to make [`PixelBuffer::new`] skip the row-aligned
//!   allocation and always use tightly packed CPU storage.
//!
//! [`PixelBuffer::new`]: buffer::PixelBuffer::new

use log::LevelFilter;

mod alloc;
pub mod buffer;
pub mod chunk;
pub mod config;
mod error;
pub mod image;
mod iter;
pub mod nn;
pub mod transform;

pub use error::{Error, Result};

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = LevelFilter::Debug;
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_PKG_NAME")), log_level)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// The calling crate and pixbridge log at *debug* level unless overridden by `RUST_LOG`.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
