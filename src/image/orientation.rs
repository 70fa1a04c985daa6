//! Orientation tags.

/// How the stored pixels of an image have to be transformed to appear upright.
///
/// The values match the EXIF orientation tag. "Stored" refers to the pixel data as it sits in
/// memory, "display" to the upright image a viewer should see.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Orientation {
    /// Stored pixels are already upright.
    #[default]
    Up = 1,
    /// Mirrored left-right.
    UpMirrored = 2,
    /// Rotated by 180 degrees.
    Down = 3,
    /// Mirrored top-bottom.
    DownMirrored = 4,
    /// Transposed: mirrored along the main diagonal.
    LeftMirrored = 5,
    /// Needs a 90 degree clockwise rotation to display upright.
    Right = 6,
    /// Transversed: mirrored along the anti-diagonal.
    RightMirrored = 7,
    /// Needs a 90 degree counterclockwise rotation to display upright.
    Left = 8,
}

impl Orientation {
    pub const ALL: [Self; 8] = [
        Self::Up,
        Self::UpMirrored,
        Self::Down,
        Self::DownMirrored,
        Self::LeftMirrored,
        Self::Right,
        Self::RightMirrored,
        Self::Left,
    ];

    /// Creates an orientation from an EXIF orientation value (1-8).
    ///
    /// Returns `None` for out-of-range values.
    pub fn from_exif(value: u16) -> Option<Self> {
        Self::ALL.get(usize::from(value).checked_sub(1)?).copied()
    }

    #[inline]
    pub fn exif_value(self) -> u16 {
        self as u16
    }

    /// Returns whether displaying the image exchanges width and height.
    #[inline]
    pub fn swaps_dimensions(self) -> bool {
        matches!(
            self,
            Self::LeftMirrored | Self::Right | Self::RightMirrored | Self::Left
        )
    }

    /// Clockwise rotation in degrees (0, 90, 180 or 270) applied after the optional horizontal
    /// mirror to make the stored pixels upright.
    pub fn rotation_degrees(self) -> u32 {
        match self {
            Self::Up | Self::UpMirrored => 0,
            Self::Right | Self::RightMirrored => 90,
            Self::Down | Self::DownMirrored => 180,
            Self::Left | Self::LeftMirrored => 270,
        }
    }

    /// Whether a horizontal mirror is part of making the stored pixels upright.
    pub fn is_mirrored(self) -> bool {
        matches!(
            self,
            Self::UpMirrored | Self::DownMirrored | Self::LeftMirrored | Self::RightMirrored
        )
    }

    #[inline]
    pub fn is_up(self) -> bool {
        self == Self::Up
    }
}
