//! Lockable pixel buffers.
//!
//! A [`PixelBuffer`] is raw pixel storage consisting of one plane (packed formats) or several
//! planes (planar formats such as [`PixelFormat::Nv12`]). Unlike an [`Image`], a pixel buffer is
//! mutable, but its memory can only be accessed while it is *locked*:
//!
//! - [`PixelBuffer::lock`] acquires read-only access and returns a [`ReadGuard`].
//! - [`PixelBuffer::lock_mut`] acquires read-write access and returns a [`WriteGuard`].
//!
//! Locks never block. Attempting to acquire a lock that conflicts with an existing one fails with
//! [`Error::Lock`]. The lock is released when the guard is dropped, which makes sure every exit
//! path (including early returns via `?`) unlocks the buffer.
//!
//! When buffers are allocated, their rows are aligned to [`SHAREABLE_ROW_ALIGNMENT`] bytes if
//! possible, so that the storage can be handed to GPU uploaders without repacking. If that fails
//! (or is disabled via [`crate::config::shareable_buffers`]), a tightly packed CPU-only
//! allocation is used instead.

use std::{
    collections::BTreeMap,
    fmt,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError},
};

use crate::alloc::{try_copy, try_vec};
use crate::config;
use crate::image::{Image, Orientation, PixelFormat, PlaneGeometry, Resolution};
use crate::{Error, Result};

/// Row alignment of shareable buffer allocations, in bytes.
pub const SHAREABLE_ROW_ALIGNMENT: usize = 64;

/// Storage class of a [`PixelBuffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backing {
    /// Rows are aligned to [`SHAREABLE_ROW_ALIGNMENT`] bytes.
    Shareable,
    /// Rows are tightly packed.
    Cpu,
}

/// Kind of access requested when locking a [`PixelBuffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockMode {
    ReadOnly,
    ReadWrite,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LockMode::ReadOnly => "read-only",
            LockMode::ReadWrite => "read-write",
        })
    }
}

/// Value of a buffer attachment.
#[derive(Clone, Debug, PartialEq)]
pub enum AttachmentValue {
    Text(String),
    Number(f64),
    Flag(bool),
}

impl From<&str> for AttachmentValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for AttachmentValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for AttachmentValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<bool> for AttachmentValue {
    fn from(b: bool) -> Self {
        Self::Flag(b)
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Attachment {
    value: AttachmentValue,
    propagate: bool,
}

/// Metadata attached to a [`PixelBuffer`] (color space, display scale, and so on).
///
/// Every entry is either *propagatable*, meaning it describes the pixel data and is carried over
/// to copies of the buffer, or local to the buffer it is attached to.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Attachments {
    entries: BTreeMap<String, Attachment>,
}

impl Attachments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a propagatable attachment, replacing any previous value of `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<AttachmentValue>) -> &mut Self {
        self.insert(key.into(), value.into(), true)
    }

    /// Sets an attachment that is not carried over to copies of the buffer.
    pub fn set_local(
        &mut self,
        key: impl Into<String>,
        value: impl Into<AttachmentValue>,
    ) -> &mut Self {
        self.insert(key.into(), value.into(), false)
    }

    fn insert(&mut self, key: String, value: AttachmentValue, propagate: bool) -> &mut Self {
        self.entries.insert(key, Attachment { value, propagate });
        self
    }

    pub fn get(&self, key: &str) -> Option<&AttachmentValue> {
        self.entries.get(key).map(|a| &a.value)
    }

    /// Returns whether `key` is present and propagatable.
    pub fn is_propagated(&self, key: &str) -> bool {
        self.entries.get(key).map_or(false, |a| a.propagate)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    /// Returns only the propagatable entries of `self`.
    #[must_use]
    pub fn propagated(&self) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|(_, a)| a.propagate)
                .map(|(k, a)| (k.clone(), a.clone()))
                .collect(),
        }
    }

    /// Merges `other` into `self`. Entries of `other` replace entries of `self` with the same key.
    #[must_use]
    pub fn merged(mut self, other: &Attachments) -> Self {
        self.entries
            .extend(other.entries.iter().map(|(k, a)| (k.clone(), a.clone())));
        self
    }
}

/// Raw, lockable pixel storage.
///
/// See the [module documentation](self) for the locking rules.
pub struct PixelBuffer {
    res: Resolution,
    format: PixelFormat,
    backing: Backing,
    attachments: Attachments,
    geometry: Vec<PlaneGeometry>,
    strides: Vec<usize>,
    planes: RwLock<Vec<Box<[u8]>>>,
}

impl PixelBuffer {
    /// Allocates a zero-initialized pixel buffer.
    ///
    /// # Errors
    ///
    /// Fails if `res` is empty, if `format` cannot represent `res` (eg. [`PixelFormat::Nv12`] with
    /// odd dimensions), or if the storage cannot be allocated.
    pub fn new(res: impl Into<Resolution>, format: PixelFormat) -> Result<Self> {
        Self::with_attachments(res.into(), format, Attachments::new())
    }

    /// Allocates a zero-initialized pixel buffer carrying the given attachments.
    pub fn with_attachments(
        res: Resolution,
        format: PixelFormat,
        attachments: Attachments,
    ) -> Result<Self> {
        if res.is_empty() {
            return Err(Error::InvalidDimensions(res).logged());
        }
        if format == PixelFormat::Nv12 && (res.width() % 2 != 0 || res.height() % 2 != 0) {
            return Err(Error::UnsupportedFormat {
                format,
                reason: "4:2:0 subsampled buffers need even dimensions",
            }
            .logged());
        }

        let backing = if config::shareable_buffers() {
            Backing::Shareable
        } else {
            Backing::Cpu
        };
        Self::allocate(res, format, attachments, backing)
    }

    /// Allocates storage with the requested backing. A failed shareable allocation falls back to
    /// [`Backing::Cpu`].
    fn allocate(
        res: Resolution,
        format: PixelFormat,
        attachments: Attachments,
        backing: Backing,
    ) -> Result<Self> {
        let geometry = format.planes(res);
        let (backing, strides, planes) = match backing {
            Backing::Shareable => match allocate_planes(res, &geometry, SHAREABLE_ROW_ALIGNMENT) {
                Ok((strides, planes)) => (Backing::Shareable, strides, planes),
                Err(e) => {
                    log::debug!(
                        "shareable allocation of {res} {format:?} buffer failed ({e}); \
                         falling back to CPU-only storage"
                    );
                    let (strides, planes) = allocate_planes(res, &geometry, 1)?;
                    (Backing::Cpu, strides, planes)
                }
            },
            Backing::Cpu => {
                let (strides, planes) = allocate_planes(res, &geometry, 1)?;
                (Backing::Cpu, strides, planes)
            }
        };

        log::trace!("allocated {res} {format:?} pixel buffer ({backing:?}, strides {strides:?})");
        Ok(Self {
            res,
            format,
            backing,
            attachments,
            geometry,
            strides,
            planes: RwLock::new(planes),
        })
    }

    /// Renders `image` into a new buffer of the packed pixel format `format`.
    ///
    /// Pixels are converted as by [`Image::convert`]. The buffer has no attachments.
    pub fn from_image(image: &Image, format: PixelFormat) -> Result<Self> {
        if !format.is_packed() {
            return Err(Error::UnsupportedFormat {
                format,
                reason: "images can only be rendered into packed buffers",
            }
            .logged());
        }

        let converted;
        let image = if image.format() == format {
            image
        } else {
            converted = image.convert(format)?;
            &converted
        };

        let buffer = Self::new(image.resolution(), format)?;
        {
            let mut guard = buffer.lock_mut()?;
            for (y, src) in (0..image.height()).zip(image.rows()) {
                guard.row_mut(0, y).copy_from_slice(src);
            }
        }
        Ok(buffer)
    }

    /// Copies the pixels of a packed buffer into a new [`Image`].
    pub fn to_image(&self, scale: f32, orientation: Orientation) -> Result<Image> {
        if !self.format.is_packed() {
            return Err(Error::UnsupportedFormat {
                format: self.format,
                reason: "only packed buffers can be turned into images",
            }
            .logged());
        }

        let guard = self.lock()?;
        let data = try_copy("image data", guard.plane(0))?;
        Ok(Image::from_raw(self.res, self.format, self.strides[0], data)?
            .with_scale(scale)
            .with_orientation(orientation))
    }

    /// Creates a deep copy of this buffer.
    ///
    /// The copy has the same resolution and format. Its attachments are the propagatable
    /// attachments of `self`, merged with `extra` (values in `extra` take precedence).
    ///
    /// Every row is copied with the *source* stride, so that no pixel data is lost if the copy
    /// ends up with a smaller stride than `self` (which happens when `self` uses
    /// [`Backing::Shareable`] and the copy does not).
    ///
    /// # Errors
    ///
    /// Fails if `self` is currently locked for writing, or if the destination cannot be allocated
    /// or locked. Any lock taken is released before returning.
    pub fn deep_copy(&self, extra: &Attachments) -> Result<PixelBuffer> {
        let attachments = self.attachments.propagated().merged(extra);
        let copy = Self::with_attachments(self.res, self.format, attachments)?;
        self.copy_pixels_to(&copy)?;
        Ok(copy)
    }

    /// Copies every plane of `self` into `dest`, which has the same resolution and format.
    fn copy_pixels_to(&self, dest: &PixelBuffer) -> Result<()> {
        let src = self.lock()?;
        let mut dest = dest.lock_mut()?;
        for (plane, geometry) in self.geometry.iter().enumerate() {
            let dest_stride = dest.stride(plane);
            copy_plane(
                src.plane(plane),
                src.stride(plane),
                dest.plane_mut(plane),
                dest_stride,
                geometry.resolution.height() as usize,
            );
        }
        Ok(())
    }

    /// Acquires read-only access to the buffer's memory.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Lock`] if the buffer is currently locked for writing.
    pub fn lock(&self) -> Result<ReadGuard<'_>> {
        let planes = match self.planes.try_read() {
            Ok(planes) => planes,
            Err(TryLockError::WouldBlock | TryLockError::Poisoned(_)) => {
                return Err(Error::Lock(LockMode::ReadOnly).logged());
            }
        };
        log::trace!("locked {:?} ({})", self, LockMode::ReadOnly);
        Ok(ReadGuard {
            buffer: self,
            planes,
        })
    }

    /// Acquires read-write access to the buffer's memory.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Lock`] if the buffer is currently locked in any mode.
    pub fn lock_mut(&self) -> Result<WriteGuard<'_>> {
        let planes = match self.planes.try_write() {
            Ok(planes) => planes,
            Err(TryLockError::WouldBlock | TryLockError::Poisoned(_)) => {
                return Err(Error::Lock(LockMode::ReadWrite).logged());
            }
        };
        log::trace!("locked {:?} ({})", self, LockMode::ReadWrite);
        Ok(WriteGuard {
            buffer: self,
            planes,
        })
    }

    #[inline]
    pub fn resolution(&self) -> Resolution {
        self.res
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.res.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.res.height()
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    #[inline]
    pub fn backing(&self) -> Backing {
        self.backing
    }

    #[inline]
    pub fn attachments(&self) -> &Attachments {
        &self.attachments
    }

    #[inline]
    pub fn plane_count(&self) -> usize {
        self.geometry.len()
    }

    /// Returns the size and pixel stride of plane `plane`.
    #[inline]
    pub fn plane_geometry(&self, plane: usize) -> PlaneGeometry {
        self.geometry[plane]
    }

    /// Returns the number of bytes between the starts of consecutive rows of plane `plane`.
    #[inline]
    pub fn plane_stride(&self, plane: usize) -> usize {
        self.strides[plane]
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:?} PixelBuffer ({:?})",
            self.res, self.format, self.backing
        )
    }
}

/// Copies `rows` rows of `src_stride` bytes each from `src` to `dest`.
fn copy_plane(src: &[u8], src_stride: usize, dest: &mut [u8], dest_stride: usize, rows: usize) {
    for (y, src_row) in src.chunks_exact(src_stride).take(rows).enumerate() {
        let start = y * dest_stride;
        // Rows written later overwrite any spill into the following row, so only the end of the
        // plane bounds the copy.
        let len = src_stride.min(dest.len() - start);
        dest[start..start + len].copy_from_slice(&src_row[..len]);
    }
}

fn allocate_planes(
    res: Resolution,
    geometry: &[PlaneGeometry],
    alignment: usize,
) -> Result<(Vec<usize>, Vec<Box<[u8]>>)> {
    let mut strides = Vec::with_capacity(geometry.len());
    let mut planes = Vec::with_capacity(geometry.len());
    for plane in geometry {
        let stride = plane
            .row_bytes()
            .checked_next_multiple_of(alignment)
            .ok_or_else(|| Error::InvalidDimensions(res).logged())?;
        let len = plane
            .resolution
            .byte_size(stride)
            .ok_or_else(|| Error::InvalidDimensions(res).logged())?;
        strides.push(stride);
        planes.push(try_vec("pixel buffer plane", len, 0u8)?.into_boxed_slice());
    }
    Ok((strides, planes))
}

/// Read-only access to a locked [`PixelBuffer`]. Unlocks the buffer when dropped.
pub struct ReadGuard<'a> {
    buffer: &'a PixelBuffer,
    planes: RwLockReadGuard<'a, Vec<Box<[u8]>>>,
}

impl ReadGuard<'_> {
    /// Returns the raw bytes of plane `plane`, including row padding.
    #[inline]
    pub fn plane(&self, plane: usize) -> &[u8] {
        &self.planes[plane]
    }

    #[inline]
    pub fn stride(&self, plane: usize) -> usize {
        self.buffer.strides[plane]
    }

    /// Returns row `y` of plane `plane`, without padding.
    #[inline]
    pub fn row(&self, plane: usize, y: u32) -> &[u8] {
        let range = row_range(self.buffer, plane, y);
        &self.planes[plane][range]
    }
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        log::trace!("unlocked {:?} ({})", self.buffer, LockMode::ReadOnly);
    }
}

/// Read-write access to a locked [`PixelBuffer`]. Unlocks the buffer when dropped.
pub struct WriteGuard<'a> {
    buffer: &'a PixelBuffer,
    planes: RwLockWriteGuard<'a, Vec<Box<[u8]>>>,
}

impl WriteGuard<'_> {
    #[inline]
    pub fn plane(&self, plane: usize) -> &[u8] {
        &self.planes[plane]
    }

    #[inline]
    pub fn plane_mut(&mut self, plane: usize) -> &mut [u8] {
        &mut self.planes[plane]
    }

    #[inline]
    pub fn stride(&self, plane: usize) -> usize {
        self.buffer.strides[plane]
    }

    #[inline]
    pub fn row(&self, plane: usize, y: u32) -> &[u8] {
        let range = row_range(self.buffer, plane, y);
        &self.planes[plane][range]
    }

    #[inline]
    pub fn row_mut(&mut self, plane: usize, y: u32) -> &mut [u8] {
        let range = row_range(self.buffer, plane, y);
        &mut self.planes[plane][range]
    }
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        log::trace!("unlocked {:?} ({})", self.buffer, LockMode::ReadWrite);
    }
}

#[track_caller]
fn row_range(buffer: &PixelBuffer, plane: usize, y: u32) -> std::ops::Range<usize> {
    let geometry = buffer.geometry[plane];
    assert!(
        y < geometry.resolution.height(),
        "row {y} out of bounds for plane {plane} of {buffer:?}"
    );
    let start = y as usize * buffer.strides[plane];
    start..start + geometry.row_bytes()
}
