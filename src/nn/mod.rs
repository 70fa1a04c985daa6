//! Conversion between images and neural network tensors.
//!
//! [`encode`] turns an [`Image`] into a planar `[N, C, H, W]` tensor of values in `[0, 1]`, and
//! [`decode`] turns three planes of such values back into an RGB [`Image`].

pub mod tensor;

use itertools::{Itertools, MinMaxResult};

use crate::buffer::PixelBuffer;
use crate::image::{Image, Orientation, PixelFormat, Resolution};
use crate::{alloc::try_vec, Error, Result};

pub use tensor::{ElementType, Tensor};

/// Parameters for [`encode`].
#[derive(Clone, Debug)]
pub struct EncodeOptions {
    batch: usize,
    in_channels: usize,
    out_channels: usize,
    element_type: ElementType,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            batch: 1,
            in_channels: 4,
            out_channels: 3,
            element_type: ElementType::F32,
        }
    }
}

impl EncodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the size of the batch dimension. Only the first batch slot is filled.
    pub fn with_batch(mut self, batch: usize) -> Self {
        self.batch = batch;
        self
    }

    /// Sets the number of channels per packed input pixel.
    ///
    /// This selects the intermediate pixel layout: 1 for 8-bit gray, 3 for RGB, and 4 for BGRA.
    pub fn with_in_channels(mut self, in_channels: usize) -> Self {
        self.in_channels = in_channels;
        self
    }

    /// Sets the number of channels written to the tensor, in R, G, B, A order.
    pub fn with_out_channels(mut self, out_channels: usize) -> Self {
        self.out_channels = out_channels;
        self
    }

    pub fn with_element_type(mut self, element_type: ElementType) -> Self {
        self.element_type = element_type;
        self
    }

    pub fn batch(&self) -> usize {
        self.batch
    }

    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }
}

/// Parameters for [`decode`].
#[derive(Clone, Debug)]
pub struct DecodeOptions {
    normalize: bool,
    clip: bool,
    scale: f32,
    orientation: Orientation,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            normalize: false,
            clip: true,
            scale: 1.0,
            orientation: Orientation::Up,
        }
    }
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rescales all samples by the global minimum and maximum of the three planes before
    /// conversion, so that they span `[0, 1]`.
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Accepted for interface compatibility. Values are always clamped to `[0, 1]` during byte
    /// conversion, so this setting currently has no effect.
    pub fn with_clip(mut self, clip: bool) -> Self {
        self.clip = clip;
        self
    }

    /// Sets the display scale of the decoded image.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Sets the orientation tag of the decoded image.
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn normalize(&self) -> bool {
        self.normalize
    }

    pub fn clip(&self) -> bool {
        self.clip
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }
}

/// Encodes `image` as a `[batch, out_channels, height, width]` tensor.
///
/// The image is first rendered into a packed pixel buffer with `in_channels` channels. Each pixel
/// of that buffer is then decoded into R, G, B, A order, and the first `out_channels` channels are
/// divided by 255 and stored at `[0, c, y, x]`. Batch slots after the first remain zero.
///
/// # Errors
///
/// Fails if `in_channels` is not 1, 3 or 4, if `out_channels` is 0 or exceeds the number of
/// channels the intermediate buffer provides, if `batch` is 0, or if an allocation fails.
pub fn encode(image: &Image, options: &EncodeOptions) -> Result<Tensor> {
    let format = PixelFormat::packed_with_channels(options.in_channels).ok_or_else(|| {
        Error::mismatch("input channel count", "1, 3 or 4", options.in_channels).logged()
    })?;
    if options.out_channels == 0 || options.out_channels > format.channels() {
        return Err(Error::mismatch(
            "output channel count",
            format!("1 to {} for {format:?} pixels", format.channels()),
            options.out_channels,
        )
        .logged());
    }
    if options.batch == 0 {
        return Err(Error::mismatch("batch size", "at least 1", 0).logged());
    }

    let buffer = PixelBuffer::from_image(image, format)?;
    let (width, height) = (image.width() as usize, image.height() as usize);
    let mut tensor = Tensor::zeros(
        &[options.batch, options.out_channels, height, width],
        options.element_type,
    )?;
    log::trace!("encoding {image:?} via {format:?} buffer into {tensor:?}");

    let guard = buffer.lock()?;
    for y in 0..height {
        let row = guard.row(0, y as u32);
        for (x, px) in row.chunks_exact(format.bytes_per_pixel()).enumerate() {
            let channels = format.decode(px);
            for (c, &value) in channels[..options.out_channels].iter().enumerate() {
                tensor.set(&[0, c, y, x], f32::from(value) / 255.0);
            }
        }
    }

    Ok(tensor)
}

/// Decodes three planes of `tensor` into an RGB [`Image`] of the given size.
///
/// The first `3 * height * width` elements of `tensor` are read as consecutive red, green and blue
/// planes, regardless of the tensor's shape. Each value `v` becomes the byte
/// `round(clamp(v * 255, 0, 255))`.
///
/// # Errors
///
/// Fails if `width` or `height` is 0, if `tensor` holds fewer than `3 * height * width` elements,
/// or if an allocation fails.
pub fn decode(tensor: &Tensor, height: u32, width: u32, options: &DecodeOptions) -> Result<Image> {
    let res = Resolution::new(width, height);
    if res.is_empty() {
        return Err(Error::InvalidDimensions(res).logged());
    }
    let plane_len = res.num_pixels() as usize;
    let needed = plane_len
        .checked_mul(3)
        .ok_or_else(|| Error::InvalidDimensions(res).logged())?;
    if tensor.len() < needed {
        return Err(Error::mismatch(
            "tensor element count",
            format!(">= {needed} for {res} RGB planes"),
            tensor.len(),
        )
        .logged());
    }

    let mut planes = try_vec("decoded planes", needed, 0.0f32)?;
    for (i, out) in planes.iter_mut().enumerate() {
        *out = tensor.get_flat(i);
    }
    if options.normalize {
        normalize(&mut planes);
    }

    let buffer = PixelBuffer::new(res, PixelFormat::Rgb8)?;
    {
        let mut guard = buffer.lock_mut()?;
        for y in 0..height {
            let row = guard.row_mut(0, y);
            let offset = y as usize * width as usize;
            for (x, px) in row.chunks_exact_mut(3).enumerate() {
                let i = offset + x;
                for (c, out) in px.iter_mut().enumerate() {
                    *out = to_byte(planes[c * plane_len + i]);
                }
            }
        }
    }

    log::trace!("decoded {tensor:?} into {res} RGB image");
    buffer.to_image(options.scale, options.orientation)
}

/// Rescales `values` in place so that their joint minimum maps to 0 and their maximum to 1.
///
/// If all values are equal, they all become 0.
fn normalize(values: &mut [f32]) {
    let (min, max) = match values.iter().copied().minmax() {
        MinMaxResult::NoElements => return,
        MinMaxResult::OneElement(v) => (v, v),
        MinMaxResult::MinMax(min, max) => (min, max),
    };

    let range = max - min;
    for v in values {
        *v = if range > 0.0 { (*v - min) / range } else { 0.0 };
    }
}

#[inline]
fn to_byte(v: f32) -> u8 {
    (v * 255.0).clamp(0.0, 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::image::Color;

    #[test]
    fn byte_conversion() {
        assert_eq!(to_byte(0.0), 0);
        assert_eq!(to_byte(1.0), 255);
        assert_eq!(to_byte(0.5), 128);
        assert_eq!(to_byte(-3.0), 0);
        assert_eq!(to_byte(7.0), 255);
    }

    #[test]
    fn joint_normalization() {
        let mut values = [0.2, 0.5, 0.8, 0.4];
        normalize(&mut values);
        assert_relative_eq!(values[0], 0.0);
        assert_relative_eq!(values[1], 0.5, epsilon = 1e-6);
        assert_relative_eq!(values[2], 1.0);

        let mut constant = [0.3; 3];
        normalize(&mut constant);
        assert_eq!(constant, [0.0; 3]);
    }

    #[test]
    fn encode_layout() {
        let image = Image::filled((3, 2), PixelFormat::Rgba8, Color::from_rgb8(255, 51, 0)).unwrap();
        let tensor = encode(&image, &EncodeOptions::new().with_batch(2)).unwrap();
        assert_eq!(tensor.shape(), &[2, 3, 2, 3]);
        assert_relative_eq!(tensor.get(&[0, 0, 1, 2]), 1.0);
        assert_relative_eq!(tensor.get(&[0, 1, 1, 2]), 0.2);
        assert_relative_eq!(tensor.get(&[0, 2, 0, 0]), 0.0);
        assert_eq!(tensor.get(&[1, 0, 0, 0]), 0.0);
    }

    #[test]
    fn encode_alpha_and_gray() {
        let image = Image::filled((1, 1), PixelFormat::Rgba8, Color::WHITE.with_alpha(51)).unwrap();
        let tensor = encode(&image, &EncodeOptions::new().with_out_channels(4)).unwrap();
        assert_relative_eq!(tensor.get(&[0, 3, 0, 0]), 0.2);

        let options = EncodeOptions::new()
            .with_in_channels(1)
            .with_out_channels(1)
            .with_element_type(ElementType::F16);
        let tensor = encode(&image, &options).unwrap();
        assert_eq!(tensor.element_type(), ElementType::F16);
        assert_eq!(tensor.get(&[0, 0, 0, 0]), 1.0);
    }

    #[test]
    fn encode_rejects_channel_counts() {
        let image = Image::filled((1, 1), PixelFormat::Rgb8, Color::WHITE).unwrap();
        for options in [
            EncodeOptions::new().with_in_channels(2),
            EncodeOptions::new().with_in_channels(3).with_out_channels(4),
            EncodeOptions::new().with_out_channels(0),
            EncodeOptions::new().with_batch(0),
        ] {
            assert!(
                matches!(encode(&image, &options), Err(Error::Mismatch { .. })),
                "{options:?}"
            );
        }
    }

    #[test]
    fn decode_planes() {
        // 2x1 image: red plane, green plane, blue plane.
        let tensor = Tensor::from_vec(&[1, 3, 1, 2], vec![1.0, 0.0, 0.0, 0.5, 0.0, 1.0]).unwrap();
        let options = DecodeOptions::new()
            .with_scale(3.0)
            .with_orientation(Orientation::Down);
        let image = decode(&tensor, 1, 2, &options).unwrap();
        assert_eq!(image.format(), PixelFormat::Rgb8);
        assert_eq!(image.scale(), 3.0);
        assert_eq!(image.orientation(), Orientation::Down);
        assert_eq!(image.pixel(0, 0), Color::RED);
        assert_eq!(image.pixel(1, 0), Color::from_rgb8(0, 128, 255));
    }

    #[test]
    fn clip_has_no_effect() {
        let values = vec![-0.5, 1.7, 0.25, 1.0, -2.0, 3.5];
        let tensor = Tensor::from_vec(&[1, 3, 1, 2], values).unwrap();
        for normalize in [false, true] {
            let base = DecodeOptions::new().with_normalize(normalize);
            let clipped = decode(&tensor, 1, 2, &base.clone().with_clip(true)).unwrap();
            let unclipped = decode(&tensor, 1, 2, &base.with_clip(false)).unwrap();
            assert_eq!(clipped, unclipped, "normalize: {normalize}");
        }

        let image = decode(&tensor, 1, 2, &DecodeOptions::new().with_clip(false)).unwrap();
        assert_eq!(image.pixel(0, 0), Color::from_rgb8(0, 64, 0));
        assert_eq!(image.pixel(1, 0), Color::from_rgb8(255, 255, 255));
    }

    #[test]
    fn decode_rejects_short_tensor() {
        let tensor = Tensor::zeros(&[1, 2, 2, 2], ElementType::F32).unwrap();
        assert!(matches!(
            decode(&tensor, 2, 2, &DecodeOptions::new()),
            Err(Error::Mismatch { .. })
        ));
        assert!(decode(&tensor, 0, 2, &DecodeOptions::new()).is_err());
    }
}
