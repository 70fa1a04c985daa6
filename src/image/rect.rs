use std::fmt;

/// An axis-aligned rectangle in pixel coordinates.
///
/// Rectangles use unsigned integer coordinates with the origin in the top left corner of an image.
/// They are allowed to have zero height and/or width.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl Rect {
    /// Creates a rectangle extending downwards and right from a point.
    #[inline]
    pub const fn from_top_left(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns the X coordinate of the left side of the rectangle.
    #[inline]
    pub fn x(&self) -> u32 {
        self.x
    }

    /// Returns the Y coordinate of the top side of the rectangle.
    #[inline]
    pub fn y(&self) -> u32 {
        self.y
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the exclusive right edge, widened to avoid overflow.
    #[inline]
    pub fn right(&self) -> u64 {
        u64::from(self.x) + u64::from(self.width)
    }

    /// Returns the exclusive bottom edge, widened to avoid overflow.
    #[inline]
    pub fn bottom(&self) -> u64 {
        u64::from(self.y) + u64::from(self.height)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[must_use]
    pub fn move_to(&self, x: u32, y: u32) -> Rect {
        Rect::from_top_left(x, y, self.width, self.height)
    }

    /// Computes the intersection of `self` and `other`.
    ///
    /// Returns `None` when the intersection is empty (ie. the rectangles do not overlap).
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x_min = self.x.max(other.x);
        let y_min = self.y.max(other.y);
        let x_max = self.right().min(other.right());
        let y_max = self.bottom().min(other.bottom());
        if u64::from(x_min) >= x_max || u64::from(y_min) >= y_max {
            return None;
        }

        // `x_max`/`y_max` are bounded by one of the inputs, so they fit in a `u32` extent.
        Some(Rect::from_top_left(
            x_min,
            y_min,
            (x_max - u64::from(x_min)) as u32,
            (y_max - u64::from(y_min)) as u32,
        ))
    }

    /// Returns whether `self` contains `other`.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.x <= other.x
            && self.y <= other.y
            && self.right() >= other.right()
            && self.bottom() >= other.bottom()
    }
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (x, y, w, h) = (self.x, self.y, self.width, self.height);
        let (bx, by) = (self.right(), self.bottom());
        write!(f, "Rect @ ({x},{y})-({bx},{by})/{w}x{h}")
    }
}
