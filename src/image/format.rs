//! Pixel formats and their byte-order contracts.

use super::{Color, Resolution};

/// Memory layout of the pixels of an [`Image`][super::Image] or
/// [`PixelBuffer`][crate::buffer::PixelBuffer].
///
/// The byte order of every packed format is fixed and independent of the host's endianness. When
/// packed pixels are decoded into channels, the channels are always yielded in canonical
/// *R, G, B, A* order (see [`PixelFormat::decode`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 1 byte per pixel: luma.
    Gray8,
    /// 3 bytes per pixel, in memory order `R, G, B`.
    Rgb8,
    /// 4 bytes per pixel, in memory order `R, G, B, A`.
    Rgba8,
    /// 4 bytes per pixel, in memory order `B, G, R, A`.
    ///
    /// This is the layout produced by storing a 32-bit `0xAARRGGBB` value in little-endian byte
    /// order, which is what most platform compositors use for their native surfaces.
    Bgra8,
    /// Bi-planar 4:2:0 YCbCr: a full-resolution 8-bit Y plane followed by a half-resolution plane
    /// of interleaved `Cb, Cr` byte pairs.
    ///
    /// Only pixel buffers can use this format. Width and height must be even.
    Nv12,
}

/// Size and pixel stride of one plane of a pixel format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaneGeometry {
    pub resolution: Resolution,
    pub bytes_per_pixel: usize,
}

impl PlaneGeometry {
    /// Number of meaningful bytes in one row of this plane.
    #[inline]
    pub fn row_bytes(&self) -> usize {
        self.resolution.width() as usize * self.bytes_per_pixel
    }
}

impl PixelFormat {
    /// Returns whether all channels of a pixel are interleaved in a single plane.
    #[inline]
    pub fn is_packed(self) -> bool {
        !matches!(self, Self::Nv12)
    }

    /// Returns the number of planes a buffer of this format consists of.
    #[inline]
    pub fn plane_count(self) -> usize {
        match self {
            Self::Nv12 => 2,
            _ => 1,
        }
    }

    /// Returns the number of bytes per pixel of the first (or only) plane.
    #[inline]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Gray8 | Self::Nv12 => 1,
            Self::Rgb8 => 3,
            Self::Rgba8 | Self::Bgra8 => 4,
        }
    }

    /// Returns the number of channels that [`PixelFormat::decode`] yields for one pixel.
    #[inline]
    pub fn channels(self) -> usize {
        match self {
            Self::Gray8 => 1,
            Self::Rgb8 | Self::Nv12 => 3,
            Self::Rgba8 | Self::Bgra8 => 4,
        }
    }

    #[inline]
    pub fn has_alpha(self) -> bool {
        matches!(self, Self::Rgba8 | Self::Bgra8)
    }

    /// Returns the packed format that stores `channels` channels per pixel, if there is one.
    ///
    /// 4-channel data is stored as [`PixelFormat::Bgra8`].
    pub fn packed_with_channels(channels: usize) -> Option<Self> {
        match channels {
            1 => Some(Self::Gray8),
            3 => Some(Self::Rgb8),
            4 => Some(Self::Bgra8),
            _ => None,
        }
    }

    /// Computes the geometry of every plane of a `res`-sized buffer in this format.
    pub fn planes(self, res: Resolution) -> Vec<PlaneGeometry> {
        match self {
            Self::Nv12 => vec![
                PlaneGeometry {
                    resolution: res,
                    bytes_per_pixel: 1,
                },
                PlaneGeometry {
                    resolution: Resolution::new(res.width() / 2, res.height() / 2),
                    bytes_per_pixel: 2,
                },
            ],
            _ => vec![PlaneGeometry {
                resolution: res,
                bytes_per_pixel: self.bytes_per_pixel(),
            }],
        }
    }

    /// Decodes one packed pixel into its channels in canonical `R, G, B, A` order.
    ///
    /// Only the first [`channels()`][Self::channels] entries of the result are meaningful, the
    /// rest are 0. A [`PixelFormat::Gray8`] pixel yields its luma as the only channel.
    ///
    /// # Panics
    ///
    /// This will panic if `px` is shorter than [`bytes_per_pixel()`][Self::bytes_per_pixel], or if
    /// `self` is not a packed format.
    #[inline]
    pub fn decode(self, px: &[u8]) -> [u8; 4] {
        match self {
            Self::Gray8 => [px[0], 0, 0, 0],
            Self::Rgb8 => [px[0], px[1], px[2], 0],
            Self::Rgba8 => [px[0], px[1], px[2], px[3]],
            Self::Bgra8 => [px[2], px[1], px[0], px[3]],
            Self::Nv12 => panic!("cannot decode pixels of planar format {self:?}"),
        }
    }

    /// Reads one packed pixel as a [`Color`].
    ///
    /// Formats without alpha channel yield opaque colors, and gray pixels are replicated to all
    /// color channels.
    #[inline]
    pub(crate) fn read_color(self, px: &[u8]) -> Color {
        match self {
            Self::Gray8 => Color([px[0], px[0], px[0], 255]),
            Self::Rgb8 => Color([px[0], px[1], px[2], 255]),
            _ => Color(self.decode(px)),
        }
    }

    /// Writes a [`Color`] into one packed pixel.
    ///
    /// Alpha is dropped for formats without alpha channel, and color is reduced to luma for
    /// [`PixelFormat::Gray8`].
    #[inline]
    pub(crate) fn write_color(self, color: Color, out: &mut [u8]) {
        match self {
            Self::Gray8 => out[0] = color.luma(),
            Self::Rgb8 => out[..3].copy_from_slice(&color.0[..3]),
            Self::Rgba8 => out[..4].copy_from_slice(&color.0),
            Self::Bgra8 => out[..4].copy_from_slice(&[color.b(), color.g(), color.r(), color.a()]),
            Self::Nv12 => panic!("cannot encode pixels of planar format {self:?}"),
        }
    }
}
