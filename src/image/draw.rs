//! An in-memory rendering canvas.
//!
//! [`Canvas`] is the drawing primitive the geometric transforms are built on: it owns a mutable
//! pixel grid and can draw [`Image`]s into it, either at an integer offset or through an arbitrary
//! affine transform. Once drawing is done, [`Canvas::finish`] turns it into an immutable [`Image`].

use nalgebra::{Matrix3, Vector3};

use super::{Color, Image, Orientation, PixelFormat, Resolution};
use crate::alloc::try_vec;
use crate::{Error, Result};

/// How source pixels are sampled when drawing through a transform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sampling {
    /// Use the source pixel containing the sample point.
    Nearest,
    /// Interpolate linearly between the 4 source pixels closest to the sample point.
    Bilinear,
}

/// A mutable pixel grid that images can be drawn into.
pub struct Canvas {
    res: Resolution,
    format: PixelFormat,
    background: Color,
    data: Vec<u8>,
}

impl Canvas {
    /// Creates a canvas of the given size and packed pixel format, filled with `background`.
    pub fn new(res: impl Into<Resolution>, format: PixelFormat, background: Color) -> Result<Self> {
        let res = res.into();
        if res.is_empty() {
            return Err(Error::InvalidDimensions(res).logged());
        }
        if !format.is_packed() {
            return Err(Error::UnsupportedFormat {
                format,
                reason: "canvases require a packed pixel format",
            }
            .logged());
        }

        let len = (res.num_pixels() as usize)
            .checked_mul(format.bytes_per_pixel())
            .ok_or_else(|| Error::InvalidDimensions(res).logged())?;
        let mut data = try_vec("canvas", len, 0)?;
        let mut px = [0; 4];
        format.write_color(background, &mut px);
        for dest in data.chunks_exact_mut(format.bytes_per_pixel()) {
            dest.copy_from_slice(&px[..dest.len()]);
        }

        Ok(Self {
            res,
            format,
            background,
            data,
        })
    }

    #[inline]
    pub fn resolution(&self) -> Resolution {
        self.res
    }

    #[inline]
    fn stride(&self) -> usize {
        self.res.width() as usize * self.format.bytes_per_pixel()
    }

    fn put(&mut self, x: u32, y: u32, color: Color) {
        let bpp = self.format.bytes_per_pixel();
        let start = y as usize * self.stride() + x as usize * bpp;
        self.format
            .write_color(color, &mut self.data[start..start + bpp]);
    }

    /// Draws `src` with its top left corner at `(x, y)`.
    ///
    /// Pixels are copied (not blended), converting the pixel format if necessary. Parts of `src`
    /// outside of the canvas are clipped.
    pub fn draw_at(&mut self, src: &Image, x: u32, y: u32) {
        let Some(area) = self.res.rect().intersection(&src.rect().move_to(x, y)) else {
            return;
        };

        let bpp = self.format.bytes_per_pixel();
        let stride = self.stride();
        for dy in 0..area.height() {
            let src_row = src.row(area.y() - y + dy);
            let dest_start = (area.y() + dy) as usize * stride + area.x() as usize * bpp;
            let dest_row = &mut self.data[dest_start..dest_start + area.width() as usize * bpp];
            let src_row = &src_row[(area.x() - x) as usize * src.format().bytes_per_pixel()..];

            if src.format() == self.format {
                dest_row.copy_from_slice(&src_row[..dest_row.len()]);
            } else {
                let src_bpp = src.format().bytes_per_pixel();
                for (dest, px) in dest_row
                    .chunks_exact_mut(bpp)
                    .zip(src_row.chunks_exact(src_bpp))
                {
                    self.format.write_color(src.format().read_color(px), dest);
                }
            }
        }
    }

    /// Draws `src` through the affine transform `transform`.
    ///
    /// `transform` maps continuous source coordinates to continuous canvas coordinates (pixel
    /// `(x, y)` covers the unit square starting at `(x, y)`, so its center is at
    /// `(x + 0.5, y + 0.5)`). Every canvas pixel whose center maps to a point outside of `src` is
    /// filled with the canvas background.
    ///
    /// # Errors
    ///
    /// Fails if `transform` is not invertible.
    pub fn draw_transformed(
        &mut self,
        src: &Image,
        transform: &Matrix3<f32>,
        sampling: Sampling,
    ) -> Result<()> {
        let inverse = transform.try_inverse().ok_or_else(|| {
            Error::mismatch("transform", "invertible affine transform", transform).logged()
        })?;
        log::trace!("drawing {src:?} into {} canvas via {inverse:?}", self.res);

        for y in 0..self.res.height() {
            for x in 0..self.res.width() {
                let p = inverse * Vector3::new(x as f32 + 0.5, y as f32 + 0.5, 1.0);
                let color = match sampling {
                    Sampling::Nearest => self.sample_nearest(src, p.x, p.y),
                    Sampling::Bilinear => self.sample_bilinear(src, p.x, p.y),
                };
                self.put(x, y, color);
            }
        }

        Ok(())
    }

    fn source_pixel(&self, src: &Image, x: i64, y: i64) -> Color {
        if x < 0 || y < 0 || x >= i64::from(src.width()) || y >= i64::from(src.height()) {
            return self.background;
        }
        src.pixel(x as u32, y as u32)
    }

    fn sample_nearest(&self, src: &Image, x: f32, y: f32) -> Color {
        self.source_pixel(src, x.floor() as i64, y.floor() as i64)
    }

    fn sample_bilinear(&self, src: &Image, x: f32, y: f32) -> Color {
        // Shift to pixel-center coordinates.
        let (x, y) = (x - 0.5, y - 0.5);
        let (x0, y0) = (x.floor(), y.floor());
        let (fx, fy) = (x - x0, y - y0);
        let (x0, y0) = (x0 as i64, y0 as i64);

        let taps = [
            (self.source_pixel(src, x0, y0), (1.0 - fx) * (1.0 - fy)),
            (self.source_pixel(src, x0 + 1, y0), fx * (1.0 - fy)),
            (self.source_pixel(src, x0, y0 + 1), (1.0 - fx) * fy),
            (self.source_pixel(src, x0 + 1, y0 + 1), fx * fy),
        ];

        let mut acc = [0.0f32; 4];
        for (color, weight) in taps {
            for (acc, c) in acc.iter_mut().zip(color.0) {
                *acc += f32::from(c) * weight;
            }
        }
        Color(acc.map(|c| c.round().clamp(0.0, 255.0) as u8))
    }

    /// Finalizes the canvas into an [`Image`] with the given scale and orientation tag.
    pub fn finish(self, scale: f32, orientation: Orientation) -> Result<Image> {
        let stride = self.stride();
        Ok(Image::from_raw(self.res, self.format, stride, self.data)?
            .with_scale(scale)
            .with_orientation(orientation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> Image {
        let data = [
            Color::RED,
            Color::GREEN,
            Color::BLUE,
            Color::WHITE,
        ]
        .into_iter()
        .flat_map(|c| c.0)
        .collect();
        Image::from_raw((2, 2), PixelFormat::Rgba8, 8, data).unwrap()
    }

    #[test]
    fn background() {
        let image = Canvas::new((2, 1), PixelFormat::Bgra8, Color::BLUE)
            .unwrap()
            .finish(1.0, Orientation::Up)
            .unwrap();
        assert_eq!(image.raw_bytes(), &[255, 0, 0, 255, 255, 0, 0, 255]);
        assert!(Canvas::new((0, 1), PixelFormat::Rgb8, Color::BLACK).is_err());
    }

    #[test]
    fn draw_at_clips() {
        let mut canvas = Canvas::new((3, 3), PixelFormat::Rgb8, Color::BLACK).unwrap();
        canvas.draw_at(&checker(), 2, 2);
        canvas.draw_at(&checker(), 5, 0);
        let image = canvas.finish(1.0, Orientation::Up).unwrap();
        assert_eq!(image.pixel(2, 2), Color::RED);
        assert_eq!(image.pixel(1, 1), Color::BLACK);
        assert_eq!(image.pixel(2, 1), Color::BLACK);
    }

    #[test]
    fn identity_transform() {
        let src = checker();
        for sampling in [Sampling::Nearest, Sampling::Bilinear] {
            let mut canvas = Canvas::new((2, 2), PixelFormat::Rgba8, Color::BLACK).unwrap();
            canvas
                .draw_transformed(&src, &Matrix3::identity(), sampling)
                .unwrap();
            assert_eq!(canvas.finish(1.0, Orientation::Up).unwrap(), src);
        }
    }

    #[test]
    fn translation_exposes_background() {
        let mut canvas = Canvas::new((2, 2), PixelFormat::Rgba8, Color::BLACK).unwrap();
        let shift = Matrix3::new(1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0);
        canvas
            .draw_transformed(&checker(), &shift, Sampling::Nearest)
            .unwrap();
        let image = canvas.finish(1.0, Orientation::Up).unwrap();
        assert_eq!(image.pixel(0, 0), Color::BLACK);
        assert_eq!(image.pixel(1, 0), Color::RED);
        assert_eq!(image.pixel(1, 1), Color::BLUE);
    }

    #[test]
    fn singular_transform() {
        let mut canvas = Canvas::new((2, 2), PixelFormat::Rgba8, Color::BLACK).unwrap();
        assert!(matches!(
            canvas.draw_transformed(&checker(), &Matrix3::zeros(), Sampling::Nearest),
            Err(Error::Mismatch { .. })
        ));
    }
}
