//! Conversions between [`Image`]s and raw interleaved byte arrays.

use super::{Image, Orientation, PixelFormat, Resolution};
use crate::buffer::PixelBuffer;
use crate::{Error, Result};

impl Image {
    /// Returns the pixel data as tightly packed, interleaved RGBA bytes.
    ///
    /// [`PixelFormat::Rgba8`] images are returned exactly as stored (minus row padding). Other
    /// formats are converted first.
    pub fn to_rgba8_bytes(&self) -> Result<Vec<u8>> {
        if self.format() == PixelFormat::Rgba8 {
            return self.to_compact_vec();
        }
        self.convert(PixelFormat::Rgba8)?.to_compact_vec()
    }

    /// Returns the pixel data as tightly packed 8-bit luma values.
    ///
    /// Color images are reduced to their Rec. 601 luma.
    pub fn to_gray8_bytes(&self) -> Result<Vec<u8>> {
        if self.format() == PixelFormat::Gray8 {
            return self.to_compact_vec();
        }
        self.convert(PixelFormat::Gray8)?.to_compact_vec()
    }

    /// Creates an [`Rgba8`][PixelFormat::Rgba8] image from tightly packed, interleaved RGBA bytes.
    ///
    /// # Errors
    ///
    /// Fails if `bytes.len()` is not exactly `width * height * 4`, or if `res` is empty.
    pub fn from_rgba8_bytes(
        bytes: &[u8],
        res: impl Into<Resolution>,
        scale: f32,
        orientation: Orientation,
    ) -> Result<Self> {
        from_packed_bytes(bytes, res.into(), PixelFormat::Rgba8, scale, orientation)
    }

    /// Creates a [`Gray8`][PixelFormat::Gray8] image from tightly packed 8-bit luma values.
    ///
    /// # Errors
    ///
    /// Fails if `bytes.len()` is not exactly `width * height`, or if `res` is empty.
    pub fn from_gray8_bytes(
        bytes: &[u8],
        res: impl Into<Resolution>,
        scale: f32,
        orientation: Orientation,
    ) -> Result<Self> {
        from_packed_bytes(bytes, res.into(), PixelFormat::Gray8, scale, orientation)
    }
}

fn from_packed_bytes(
    bytes: &[u8],
    res: Resolution,
    format: PixelFormat,
    scale: f32,
    orientation: Orientation,
) -> Result<Image> {
    let row_bytes = res.width() as usize * format.bytes_per_pixel();
    let expected = res.byte_size(row_bytes);
    if expected != Some(bytes.len()) {
        let expected = match expected {
            Some(len) => len.to_string(),
            None => "an addressable size".to_string(),
        };
        return Err(Error::mismatch("byte array length", expected, bytes.len()).logged());
    }

    let buffer = PixelBuffer::new(res, format)?;
    {
        let mut guard = buffer.lock_mut()?;
        for (y, src) in (0..res.height()).zip(bytes.chunks_exact(row_bytes)) {
            guard.row_mut(0, y).copy_from_slice(src);
        }
    }
    buffer.to_image(scale, orientation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Color;

    #[test]
    fn rgba_round_trip() {
        let bytes: Vec<u8> = (0..2 * 3 * 4).map(|b| b as u8 * 10).collect();
        let image = Image::from_rgba8_bytes(&bytes, (2, 3), 2.0, Orientation::Left).unwrap();
        assert_eq!(image.resolution(), Resolution::new(2, 3));
        assert_eq!(image.scale(), 2.0);
        assert_eq!(image.orientation(), Orientation::Left);
        assert_eq!(image.pixel(1, 0), Color::from_rgba8(40, 50, 60, 70));
        assert_eq!(image.to_rgba8_bytes().unwrap(), bytes);
    }

    #[test]
    fn gray_bytes() {
        let image = Image::from_gray8_bytes(&[0, 128, 255, 7], (2, 2), 1.0, Orientation::Up).unwrap();
        assert_eq!(image.format(), PixelFormat::Gray8);
        assert_eq!(image.to_gray8_bytes().unwrap(), [0, 128, 255, 7]);
        assert_eq!(
            image.to_rgba8_bytes().unwrap()[4..8],
            [128, 128, 128, 255],
        );
    }

    #[test]
    fn color_to_gray() {
        let image = Image::filled((1, 1), PixelFormat::Bgra8, Color::GREEN).unwrap();
        assert_eq!(image.to_gray8_bytes().unwrap(), [150]);
    }

    #[test]
    fn length_mismatch() {
        assert!(matches!(
            Image::from_rgba8_bytes(&[0; 15], (2, 2), 1.0, Orientation::Up),
            Err(Error::Mismatch { .. })
        ));
        assert!(matches!(
            Image::from_gray8_bytes(&[0; 5], (2, 2), 1.0, Orientation::Up),
            Err(Error::Mismatch { .. })
        ));
        assert!(Image::from_gray8_bytes(&[], (0, 2), 1.0, Orientation::Up).is_err());
    }
}
