//! Geometric image transforms: resizing, rotation and orientation correction.
//!
//! All functions take the source image by reference and return a new [`Image`]. Tiling lives in
//! [`crate::chunk`].

use image::{imageops, imageops::FilterType, ImageBuffer, Luma, Pixel, Rgb, Rgba};
use nalgebra::{Matrix3, Rotation2, Vector2};

use crate::config;
use crate::image::draw::{Canvas, Sampling};
use crate::image::{Color, Image, Orientation, PixelFormat, Resolution};
use crate::{Error, Result};

/// Computes the size `image` would have after fitting it into a `max_dims` by `max_dims` square.
///
/// If both dimensions already fit, they are returned unchanged. Otherwise the image is scaled down
/// uniformly so that its larger dimension becomes `max_dims`. The result is not rounded.
pub fn possible_dims(image: &Image, max_dims: f32) -> (f32, f32) {
    let (w, h) = (image.width() as f32, image.height() as f32);
    if w <= max_dims && h <= max_dims {
        return (w, h);
    }

    if w >= h {
        (max_dims, h * max_dims / w)
    } else {
        (w * max_dims / h, max_dims)
    }
}

/// Downscales `image` to fit into a `max_dims` by `max_dims` square, preserving its aspect ratio.
///
/// The size computed by [`possible_dims`] is rounded to whole pixels (at least 1). Display scale
/// and orientation tag are preserved.
///
/// # Errors
///
/// Fails if `max_dims` is not a positive, finite number, or if resampling fails.
pub fn resized(image: &Image, max_dims: f32) -> Result<Image> {
    if !(max_dims.is_finite() && max_dims > 0.0) {
        return Err(Error::mismatch("maximum dimension", "positive finite value", max_dims).logged());
    }

    let (w, h) = possible_dims(image, max_dims);
    let target = Resolution::new(w.round().max(1.0) as u32, h.round().max(1.0) as u32);
    log::trace!("fitting {image:?} into {max_dims}x{max_dims} -> {target}");
    resized_to(image, target, image.scale())
}

/// Resamples `image` to exactly `target`, and gives the result the display scale `scale`.
///
/// The aspect ratio is not preserved unless `target` already has the right one. The filter is
/// configured by [`config::resample_filter`].
///
/// # Errors
///
/// Fails if `target` is empty or if an allocation fails.
pub fn resized_to(image: &Image, target: Resolution, scale: f32) -> Result<Image> {
    if target.is_empty() {
        return Err(Error::InvalidDimensions(target).logged());
    }
    if target == image.resolution() {
        return Ok(image.clone().with_scale(scale));
    }

    Ok(apply(image, BufferOp::Resize(target, config::resample_filter()))?.with_scale(scale))
}

/// An [`imageops`] operation applied to the pixels of an [`Image`].
#[derive(Clone, Copy)]
enum BufferOp {
    Resize(Resolution, FilterType),
    Upright(Orientation),
}

/// Runs `op` on `image` through an [`ImageBuffer`] of the matching pixel type.
///
/// The result keeps the format, scale and orientation tag of `image`.
fn apply(image: &Image, op: BufferOp) -> Result<Image> {
    let format = image.format();
    let (res, data) = match format {
        PixelFormat::Gray8 => apply_as::<Luma<u8>>(image, op)?,
        PixelFormat::Rgb8 => apply_as::<Rgb<u8>>(image, op)?,
        // Channel order does not matter for resampling or reordering pixels.
        PixelFormat::Rgba8 | PixelFormat::Bgra8 => apply_as::<Rgba<u8>>(image, op)?,
        PixelFormat::Nv12 => {
            return Err(Error::UnsupportedFormat {
                format,
                reason: "planar images cannot be transformed",
            }
            .logged())
        }
    };

    let stride = res.width() as usize * format.bytes_per_pixel();
    Ok(Image::from_raw(res, format, stride, data)?
        .with_scale(image.scale())
        .with_orientation(image.orientation()))
}

fn apply_as<P>(image: &Image, op: BufferOp) -> Result<(Resolution, Vec<u8>)>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    let buf = ImageBuffer::<P, _>::from_raw(image.width(), image.height(), image.to_compact_vec()?)
        .ok_or_else(|| {
            Error::mismatch("pixel data", format!("{} pixels", image.resolution()), "fewer").logged()
        })?;
    let out = match op {
        BufferOp::Resize(target, filter) => {
            imageops::resize(&buf, target.width(), target.height(), filter)
        }
        BufferOp::Upright(orientation) => upright(buf, orientation),
    };
    Ok((Resolution::new(out.width(), out.height()), out.into_raw()))
}

/// Mirrors horizontally if needed, then turns clockwise by the orientation's quarter turns.
fn upright<P>(buf: ImageBuffer<P, Vec<u8>>, orientation: Orientation) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    let buf = if orientation.is_mirrored() {
        imageops::flip_horizontal(&buf)
    } else {
        buf
    };
    match orientation.rotation_degrees() {
        90 => imageops::rotate90(&buf),
        180 => imageops::rotate180(&buf),
        270 => imageops::rotate270(&buf),
        _ => buf,
    }
}

/// Rotates `image` clockwise by `degrees` around its center.
///
/// If `keep_size` is `true`, the result has the size of `image` and content rotated outside of it
/// is clipped. Otherwise the result is sized to the rotated image's bounding box, with each
/// dimension rounded down to whole pixels. Uncovered areas are opaque black. Display scale and
/// orientation tag are preserved.
pub fn rotated(image: &Image, degrees: f32, keep_size: bool) -> Result<Image> {
    let (w, h) = (f64::from(image.width()), f64::from(image.height()));
    let theta = f64::from(degrees).to_radians();

    let out_res = if keep_size {
        image.resolution()
    } else {
        let (sin, cos) = theta.sin_cos();
        let bw = (w * cos.abs() + h * sin.abs()).floor().max(1.0);
        let bh = (w * sin.abs() + h * cos.abs()).floor().max(1.0);
        Resolution::new(bw as u32, bh as u32)
    };
    log::trace!("rotating {image:?} by {degrees} degrees into {out_res}");

    let transform = Matrix3::new_translation(&Vector2::new(
        out_res.width() as f32 / 2.0,
        out_res.height() as f32 / 2.0,
    )) * Rotation2::new(theta as f32).to_homogeneous()
        * Matrix3::new_translation(&Vector2::new(-w as f32 / 2.0, -h as f32 / 2.0));

    let mut canvas = Canvas::new(out_res, image.format(), Color::BLACK)?;
    canvas.draw_transformed(image, &transform, Sampling::Bilinear)?;
    canvas.finish(image.scale(), image.orientation())
}

/// Re-renders `image` so that its pixels appear upright, and tags the result [`Orientation::Up`].
///
/// Images that are already upright are returned as an identical copy. Orientations that rotate by
/// a quarter turn produce an image with width and height swapped.
pub fn normalize_orientation(image: &Image) -> Result<Image> {
    let orientation = image.orientation();
    if orientation.is_up() {
        return Ok(image.clone());
    }

    log::trace!("normalizing {image:?} with {orientation:?}");
    Ok(apply(image, BufferOp::Upright(orientation))?.with_orientation(Orientation::Up))
}
