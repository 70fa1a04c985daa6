//! Types for representing image resolutions.

use std::fmt;

use crate::image::Rect;

/// Resolution (`width x height`) of an image or pixel buffer, in pixels.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    width: u32,
    height: u32,
}

impl Resolution {
    /// Creates a new [`Resolution`] of `width x height`.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns the width of this [`Resolution`].
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of this [`Resolution`].
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn num_pixels(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Returns `true` if either the width or height is zero.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns this resolution with width and height exchanged.
    #[must_use]
    pub fn transposed(&self) -> Self {
        Self::new(self.height, self.width)
    }

    /// Returns a [`Rect`] at `(0, 0)` covering the whole resolution.
    #[inline]
    pub fn rect(&self) -> Rect {
        Rect::from_top_left(0, 0, self.width, self.height)
    }

    /// Number of bytes needed for `height` rows of `stride` bytes, or `None` on overflow.
    pub(crate) fn byte_size(&self, stride: usize) -> Option<usize> {
        stride.checked_mul(self.height as usize)
    }
}

impl From<(u32, u32)> for Resolution {
    #[inline]
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width, height)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transposed() {
        let res = Resolution::new(640, 480);
        assert_eq!(res.transposed(), Resolution::new(480, 640));
        assert_eq!(res.transposed().transposed(), res);
        assert_eq!(res.to_string(), "640x480");
    }

    #[test]
    fn test_byte_size() {
        assert_eq!(Resolution::new(3, 2).byte_size(12), Some(24));
        assert_eq!(Resolution::new(1, u32::MAX).byte_size(usize::MAX), None);
    }
}
