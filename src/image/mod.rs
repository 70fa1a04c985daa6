//! Images and the types describing them.
//!
//! This module provides:
//!
//! - The [`Image`] type, an immutable raster with an explicit [`PixelFormat`], row stride, display
//!   scale and [`Orientation`] tag.
//! - [`Color`], an 8-bit RGBA color used for pixel access and canvas backgrounds.
//! - [`Resolution`] and [`Rect`], describing sizes and regions of images.
//! - The [`draw`] module, a small affine rendering canvas used by the geometric transforms.
//! - Conversions from and to raw interleaved byte arrays (`to_rgba8_bytes`, `from_rgba8_bytes`,
//!   and their grayscale counterparts).

mod bytes;
mod color;
pub mod draw;
mod format;
mod orientation;
mod rect;
mod resolution;

#[cfg(test)]
mod tests;

use std::fmt;

use image::{DynamicImage, ImageBuffer, RgbaImage};

pub use color::Color;
pub use format::{PixelFormat, PlaneGeometry};
pub use orientation::Orientation;
pub use rect::Rect;
pub use resolution::Resolution;

use crate::alloc::{try_copy, try_vec};
use crate::{Error, Result};

/// A decoded raster image.
///
/// Images are immutable: every conversion routine in this crate returns a new [`Image`]. Pixel
/// data is stored row by row, with [`Image::stride`] bytes between the starts of consecutive rows.
/// Rows may contain padding after the last pixel.
///
/// Besides its pixels, an image carries a display `scale` (pixels per point) and an
/// [`Orientation`] tag describing how the stored pixels have to be transformed to appear upright.
#[derive(Clone)]
pub struct Image {
    res: Resolution,
    format: PixelFormat,
    stride: usize,
    scale: f32,
    orientation: Orientation,
    // Invariant: `data.len() >= stride * height` and `stride >= width * bytes_per_pixel`.
    data: Box<[u8]>,
}

impl Image {
    /// Creates an [`Image`] from preexisting pixel data.
    ///
    /// `data` needs to hold `res.height()` rows of `stride` bytes each, with the pixels of each row
    /// laid out as described by `format`. The image starts out with a scale of 1 and
    /// [`Orientation::Up`].
    ///
    /// # Errors
    ///
    /// Fails if `res` is empty, if `format` is not a packed format, if `stride` is too small to
    /// hold a row, or if `data` is too short.
    pub fn from_raw(
        res: impl Into<Resolution>,
        format: PixelFormat,
        stride: usize,
        data: Vec<u8>,
    ) -> Result<Self> {
        Self::from_raw_impl(res.into(), format, stride, data)
    }

    fn from_raw_impl(
        res: Resolution,
        format: PixelFormat,
        stride: usize,
        data: Vec<u8>,
    ) -> Result<Self> {
        if res.is_empty() {
            return Err(Error::InvalidDimensions(res).logged());
        }
        if !format.is_packed() {
            return Err(Error::UnsupportedFormat {
                format,
                reason: "images require a packed pixel format",
            }
            .logged());
        }

        let row_bytes = (res.width() as usize)
            .checked_mul(format.bytes_per_pixel())
            .ok_or_else(|| Error::InvalidDimensions(res).logged())?;
        if stride < row_bytes {
            return Err(Error::mismatch("stride", format!(">= {row_bytes}"), stride).logged());
        }
        let expected = res
            .byte_size(stride)
            .ok_or_else(|| Error::InvalidDimensions(res).logged())?;
        if data.len() < expected {
            return Err(
                Error::mismatch("image data length", format!(">= {expected}"), data.len())
                    .logged(),
            );
        }

        Ok(Self {
            res,
            format,
            stride,
            scale: 1.0,
            orientation: Orientation::Up,
            data: data.into_boxed_slice(),
        })
    }

    /// Returns a new [`Image`] of the given size, with every pixel initialized to `color`.
    pub fn filled(res: impl Into<Resolution>, format: PixelFormat, color: Color) -> Result<Self> {
        let res = res.into();
        let canvas = draw::Canvas::new(res, format, color)?;
        canvas.finish(1.0, Orientation::Up)
    }

    /// Converts an image from the [`image`] crate into an [`Rgba8`][PixelFormat::Rgba8] image.
    pub fn from_dynamic(image: &DynamicImage) -> Result<Self> {
        let buf = image.to_rgba8();
        let res = Resolution::new(buf.width(), buf.height());
        Self::from_raw(res, PixelFormat::Rgba8, res.width() as usize * 4, buf.into_raw())
    }

    /// Returns this image with its display scale replaced.
    #[must_use]
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Returns this image with its orientation tag replaced.
    ///
    /// This does not modify the pixel data.
    #[must_use]
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Returns the width of this image, in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.res.width()
    }

    /// Returns the height of this image, in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.res.height()
    }

    /// Returns the size of this image.
    #[inline]
    pub fn resolution(&self) -> Resolution {
        self.res
    }

    /// Returns a [`Rect`] covering this image.
    ///
    /// The rectangle will be positioned at `(0, 0)` and have the width and height of the image.
    #[inline]
    pub fn rect(&self) -> Rect {
        self.res.rect()
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Returns the number of bytes between the start of each row of pixel data.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the display scale factor (pixels per point).
    #[inline]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    #[inline]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Returns the size of this image in points, ie. its pixel size divided by its scale.
    ///
    /// Like the pixel size, this is the size of the stored pixel data and does not take the
    /// orientation into account.
    pub fn size_in_points(&self) -> (f32, f32) {
        (
            self.width() as f32 / self.scale,
            self.height() as f32 / self.scale,
        )
    }

    #[inline]
    fn row_bytes(&self) -> usize {
        self.width() as usize * self.format.bytes_per_pixel()
    }

    /// Returns the raw underlying bytes, including any row padding.
    #[inline]
    pub fn raw_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the pixel data of row `y`, without padding.
    ///
    /// # Panics
    ///
    /// This will panic if `y` is outside the bounds of this image.
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        assert!(y < self.height(), "row {y} out of bounds for {self:?}");
        let start = y as usize * self.stride;
        &self.data[start..start + self.row_bytes()]
    }

    /// Returns an iterator over the rows of pixel data, without padding.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> + '_ {
        (0..self.height()).map(|y| self.row(y))
    }

    /// Gets the image color at the given pixel coordinates.
    ///
    /// # Panics
    ///
    /// This will panic if `(x, y)` is outside the bounds of this image.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Color {
        assert!(x < self.width(), "pixel ({x}, {y}) out of bounds for {self:?}");
        let bpp = self.format.bytes_per_pixel();
        let start = x as usize * bpp;
        self.format.read_color(&self.row(y)[start..start + bpp])
    }

    /// Collects all pixel rows into a contiguous [`Vec`] without padding.
    pub fn to_compact_vec(&self) -> Result<Vec<u8>> {
        if self.stride == self.row_bytes() {
            return try_copy("image data", &self.data[..self.stride * self.height() as usize]);
        }

        let mut out = try_vec("image data", self.row_bytes() * self.height() as usize, 0)?;
        for (dest, src) in out.chunks_exact_mut(self.row_bytes()).zip(self.rows()) {
            dest.copy_from_slice(src);
        }
        Ok(out)
    }

    /// Copies the area covered by `rect` into a new [`Image`].
    ///
    /// The result keeps the pixel format, scale and orientation tag of `self`.
    ///
    /// # Errors
    ///
    /// Fails if `rect` is empty or not fully contained in this image.
    pub fn crop(&self, rect: Rect) -> Result<Image> {
        if rect.is_empty() || !self.rect().contains_rect(&rect) {
            return Err(Error::mismatch(
                "crop rectangle",
                format!("inside {:?}", self.rect()),
                format!("{rect:?}"),
            )
            .logged());
        }

        let bpp = self.format.bytes_per_pixel();
        let row_bytes = rect.width() as usize * bpp;
        let mut data = try_vec("cropped image", row_bytes * rect.height() as usize, 0)?;
        let start = rect.x() as usize * bpp;
        for (dest, y) in data.chunks_exact_mut(row_bytes).zip(rect.y()..) {
            dest.copy_from_slice(&self.row(y)[start..start + row_bytes]);
        }

        Ok(Image::from_raw(
            Resolution::new(rect.width(), rect.height()),
            self.format,
            row_bytes,
            data,
        )?
        .with_scale(self.scale)
        .with_orientation(self.orientation))
    }

    /// Converts this image to a different packed pixel format.
    ///
    /// Alpha is dropped when converting to a format without alpha channel, formats without alpha
    /// become opaque, and color is reduced to luma when converting to
    /// [`Gray8`][PixelFormat::Gray8].
    pub fn convert(&self, format: PixelFormat) -> Result<Image> {
        if format == self.format {
            return Ok(self.clone());
        }

        let mut canvas = draw::Canvas::new(self.res, format, Color::NULL)?;
        canvas.draw_at(self, 0, 0);
        canvas.finish(self.scale, self.orientation)
    }

    /// Copies this image into an [`RgbaImage`] of the [`image`] crate.
    pub fn to_image_buffer(&self) -> Result<RgbaImage> {
        let data = self.convert(PixelFormat::Rgba8)?.to_compact_vec()?;
        ImageBuffer::from_raw(self.width(), self.height(), data).ok_or_else(|| {
            Error::mismatch("image buffer size", self.res.num_pixels() * 4, "fewer bytes")
                .logged()
        })
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} {:?} Image (scale {}, {:?})",
            self.width(),
            self.height(),
            self.format,
            self.scale,
            self.orientation,
        )
    }
}

/// Compares pixel contents, format, scale and orientation. Row padding is ignored.
impl PartialEq for Image {
    fn eq(&self, other: &Self) -> bool {
        self.res == other.res
            && self.format == other.format
            && self.scale == other.scale
            && self.orientation == other.orientation
            && self.rows().eq(other.rows())
    }
}
