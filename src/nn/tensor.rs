//! N-dimensional numeric arrays.
//!
//! A [`Tensor`] is a dense, row-major array with an arbitrary number of dimensions. Tensors are
//! what image data is turned into before it is handed to a neural network, and what network
//! outputs are turned back into images from.

use std::fmt;

use half::f16;
use ndarray::{ArrayD, IxDyn};
use tinyvec::TinyVec;

use crate::alloc::try_vec;
use crate::iter::zip_exact;
use crate::{Error, Result};

/// Numeric type of the elements stored in a [`Tensor`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ElementType {
    /// 32-bit IEEE float.
    #[default]
    F32,
    /// 16-bit IEEE float.
    F16,
    /// 64-bit IEEE float.
    F64,
}

impl ElementType {
    /// Size of one element in bytes.
    pub fn size(self) -> usize {
        match self {
            Self::F32 => 4,
            Self::F16 => 2,
            Self::F64 => 8,
        }
    }
}

/// Shape and row-major strides, stored back to back.
#[derive(Clone, PartialEq, Eq)]
struct Layout(TinyVec<[usize; 8]>);

impl Layout {
    fn from_shape(shape: &[usize]) -> Self {
        let mut vec = TinyVec::from(shape);
        vec.extend(shape.iter().map(|_| 0));

        let mut stride = 1;
        for (out, size) in zip_exact(
            vec[shape.len()..].iter_mut().rev(),
            shape.iter().copied().rev(),
        ) {
            *out = stride;
            stride *= size;
        }

        Self(vec)
    }

    fn shape(&self) -> &[usize] {
        &self.0[..self.0.len() / 2]
    }

    fn strides(&self) -> &[usize] {
        &self.0[self.0.len() / 2..]
    }

    /// Number of elements, or `None` if it does not fit in a `usize`.
    fn elements(&self) -> Option<usize> {
        self.shape()
            .iter()
            .try_fold(1usize, |acc, &size| acc.checked_mul(size))
    }

    #[track_caller]
    fn offset(&self, index: &[usize]) -> usize {
        assert!(
            index.len() == self.shape().len()
                && index.iter().zip(self.shape()).all(|(i, size)| i < size),
            "index {:?} out of bounds for tensor of shape {:?}",
            index,
            self.shape(),
        );
        zip_exact(index, self.strides())
            .map(|(i, stride)| i * stride)
            .sum()
    }
}

impl fmt::Debug for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.0).finish()
    }
}

/// Iterates over all indices of a shape in row-major order.
struct ShapeIndices<'a> {
    shape: &'a [usize],
    last: Vec<usize>,
    first: bool,
}

impl<'a> ShapeIndices<'a> {
    fn new(shape: &'a [usize]) -> Self {
        Self {
            shape,
            last: vec![0; shape.len()],
            first: true,
        }
    }

    fn next(&mut self) -> Option<&[usize]> {
        if self.first {
            self.first = false;
            if self.shape.iter().any(|&x| x == 0) {
                return None;
            } else {
                return Some(&self.last[..]);
            }
        }

        let mut has_next = false;
        for (next, shape) in zip_exact(self.last.iter_mut(), self.shape).rev() {
            if *next == *shape - 1 {
                *next = 0;
            } else {
                *next += 1;
                has_next = true;
                break;
            }
        }

        if has_next {
            Some(&self.last[..])
        } else {
            None
        }
    }
}

#[derive(Clone, PartialEq)]
enum Storage {
    F32(Box<[f32]>),
    F16(Box<[f16]>),
    F64(Box<[f64]>),
}

impl Storage {
    fn zeros(ty: ElementType, len: usize) -> Result<Self> {
        Ok(match ty {
            ElementType::F32 => Self::F32(try_vec("tensor", len, 0.0)?.into_boxed_slice()),
            ElementType::F16 => Self::F16(try_vec("tensor", len, f16::ZERO)?.into_boxed_slice()),
            ElementType::F64 => Self::F64(try_vec("tensor", len, 0.0)?.into_boxed_slice()),
        })
    }

    fn len(&self) -> usize {
        match self {
            Self::F32(data) => data.len(),
            Self::F16(data) => data.len(),
            Self::F64(data) => data.len(),
        }
    }

    fn element_type(&self) -> ElementType {
        match self {
            Self::F32(_) => ElementType::F32,
            Self::F16(_) => ElementType::F16,
            Self::F64(_) => ElementType::F64,
        }
    }

    #[inline]
    fn get(&self, i: usize) -> f32 {
        match self {
            Self::F32(data) => data[i],
            Self::F16(data) => data[i].to_f32(),
            Self::F64(data) => data[i] as f32,
        }
    }

    #[inline]
    fn set(&mut self, i: usize, value: f32) {
        match self {
            Self::F32(data) => data[i] = value,
            Self::F16(data) => data[i] = f16::from_f32(value),
            Self::F64(data) => data[i] = f64::from(value),
        }
    }
}

/// A dense, row-major tensor with a dynamic number of dimensions.
///
/// All element types are read and written as `f32`; narrower or wider storage is converted on
/// access. The number of stored elements always equals the product of the shape, so
/// [`Tensor::byte_len`] is `product(shape) * element_type().size()`.
#[derive(Clone, PartialEq)]
pub struct Tensor {
    layout: Layout,
    data: Storage,
}

impl Tensor {
    /// Creates a zero-filled tensor.
    ///
    /// # Errors
    ///
    /// Fails if the element count overflows or the storage cannot be allocated.
    pub fn zeros(shape: &[usize], ty: ElementType) -> Result<Self> {
        let layout = Layout::from_shape(shape);
        let len = layout.elements().ok_or_else(|| {
            Error::mismatch("tensor shape", "addressable element count", format!("{shape:?}"))
                .logged()
        })?;
        Ok(Self {
            data: Storage::zeros(ty, len)?,
            layout,
        })
    }

    /// Creates a tensor by calling `f` with every index of `shape`, in row-major order.
    ///
    /// `f` is called with `[0, ..., 0, 0]` first, then `[0, ..., 0, 1]` and so on.
    pub fn from_shape_fn<F: FnMut(&[usize]) -> f32>(
        shape: &[usize],
        ty: ElementType,
        mut f: F,
    ) -> Result<Self> {
        let mut tensor = Self::zeros(shape, ty)?;
        let mut indices = ShapeIndices::new(shape);
        let mut i = 0;
        while let Some(index) = indices.next() {
            tensor.data.set(i, f(index));
            i += 1;
        }
        Ok(tensor)
    }

    /// Creates an `f32` tensor of the given shape from row-major `data`.
    ///
    /// # Errors
    ///
    /// Fails if `data` does not hold exactly as many elements as `shape` describes.
    pub fn from_vec(shape: &[usize], data: Vec<f32>) -> Result<Self> {
        let layout = Layout::from_shape(shape);
        if layout.elements() != Some(data.len()) {
            return Err(Error::mismatch(
                "tensor data length",
                format!("product of {shape:?}"),
                data.len(),
            )
            .logged());
        }
        Ok(Self {
            layout,
            data: Storage::F32(data.into_boxed_slice()),
        })
    }

    /// Copies an [`ndarray`] array into a new tensor with the given element type.
    pub fn from_ndarray(array: &ArrayD<f32>, ty: ElementType) -> Result<Self> {
        let mut tensor = Self::zeros(array.shape(), ty)?;
        // `iter` visits elements in logical row-major order regardless of memory layout.
        for (i, &value) in array.iter().enumerate() {
            tensor.data.set(i, value);
        }
        Ok(tensor)
    }

    /// Copies this tensor into an `f32` [`ndarray`] array of the same shape.
    pub fn to_ndarray(&self) -> Result<ArrayD<f32>> {
        ArrayD::from_shape_vec(IxDyn(self.shape()), self.to_f32_vec()?).map_err(|e| {
            Error::mismatch("ndarray shape", format!("{:?}", self.shape()), e).logged()
        })
    }

    /// Returns the shape of this tensor, ie. the number of entries in each dimension.
    pub fn shape(&self) -> &[usize] {
        self.layout.shape()
    }

    /// Returns the row-major strides of this tensor, in elements.
    pub fn strides(&self) -> &[usize] {
        self.layout.strides()
    }

    /// Returns the number of dimensions of this tensor.
    pub fn rank(&self) -> usize {
        self.shape().len()
    }

    /// Returns the total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn element_type(&self) -> ElementType {
        self.data.element_type()
    }

    /// Size of the element storage in bytes.
    pub fn byte_len(&self) -> usize {
        self.len() * self.element_type().size()
    }

    /// Returns the element at `index`, converted to `f32`.
    ///
    /// # Panics
    ///
    /// Panics if `index` does not have one entry per dimension, or if any entry is out of bounds.
    #[track_caller]
    pub fn get(&self, index: &[usize]) -> f32 {
        self.data.get(self.layout.offset(index))
    }

    /// Stores `value` at `index`, converting it to the tensor's element type.
    ///
    /// # Panics
    ///
    /// Panics under the same conditions as [`Tensor::get`].
    #[track_caller]
    pub fn set(&mut self, index: &[usize], value: f32) {
        let offset = self.layout.offset(index);
        self.data.set(offset, value);
    }

    /// Returns the element at row-major position `i`.
    #[inline]
    pub(crate) fn get_flat(&self, i: usize) -> f32 {
        self.data.get(i)
    }

    /// Returns the underlying storage if this is an `f32` tensor.
    pub fn as_f32_slice(&self) -> Option<&[f32]> {
        match &self.data {
            Storage::F32(data) => Some(data),
            _ => None,
        }
    }

    /// Copies all elements into a row-major `Vec<f32>`.
    pub fn to_f32_vec(&self) -> Result<Vec<f32>> {
        let mut out = try_vec("tensor copy", self.len(), 0.0)?;
        for (i, out) in out.iter_mut().enumerate() {
            *out = self.data.get(i);
        }
        Ok(out)
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape())
            .field("element_type", &self.element_type())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_shape_fn() {
        let indices = [
            [0, 0, 0],
            [0, 0, 1],
            [0, 0, 2],
            [0, 1, 0],
            [0, 1, 1],
            [0, 1, 2],
        ];

        let mut iter = indices.into_iter();
        let tensor = Tensor::from_shape_fn(&[1, 2, 3], ElementType::F32, |index| {
            assert_eq!(iter.next().as_ref().map(|arr| &arr[..]), Some(index));
            0.0
        })
        .unwrap();
        assert_eq!(iter.next(), None);
        assert_eq!(tensor.rank(), 3);
        assert_eq!(tensor.shape(), &[1, 2, 3]);
        assert_eq!(tensor.strides(), &[6, 3, 1]);
    }

    #[test]
    fn empty() {
        let tensor = Tensor::from_shape_fn(&[1, 2, 0, 3], ElementType::F16, |idx| {
            unreachable!("{idx:?}")
        })
        .unwrap();
        assert_eq!(tensor.shape(), &[1, 2, 0, 3]);
        assert!(tensor.is_empty());
        assert_eq!(tensor.byte_len(), 0);
    }

    #[test]
    fn singular() {
        let mut hits = 0;
        let tensor = Tensor::from_shape_fn(&[], ElementType::F64, |_| {
            hits += 1;
            1.0
        })
        .unwrap();
        assert_eq!(hits, 1);
        assert_eq!(tensor.rank(), 0);
        assert_eq!(tensor.len(), 1);
        assert_eq!(tensor.get(&[]), 1.0);
    }

    #[test]
    fn index_2d() {
        let tensor = Tensor::from_vec(&[2, 2], vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        assert_eq!(tensor.get(&[1, 1]), 3.0);
        assert_eq!(tensor.get(&[1, 0]), 2.0);
        assert_eq!(tensor.get(&[0, 1]), 1.0);

        assert!(Tensor::from_vec(&[2, 2], vec![0.0; 3]).is_err());
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn index_out_of_bounds() {
        let tensor = Tensor::zeros(&[2, 2], ElementType::F32).unwrap();
        tensor.get(&[0, 2]);
    }

    #[test]
    fn element_types() {
        for ty in [ElementType::F32, ElementType::F16, ElementType::F64] {
            let mut tensor = Tensor::zeros(&[1, 3, 2, 2], ty).unwrap();
            assert_eq!(tensor.element_type(), ty);
            assert_eq!(tensor.len(), 12);
            assert_eq!(tensor.byte_len(), 12 * ty.size());

            tensor.set(&[0, 2, 1, 0], 0.5);
            assert_eq!(tensor.get(&[0, 2, 1, 0]), 0.5);
            assert_eq!(tensor.get_flat(10), 0.5);
        }
    }

    #[test]
    fn ndarray_interop() {
        let tensor = Tensor::from_vec(&[2, 3], (0..6).map(|i| i as f32).collect()).unwrap();
        let array = tensor.to_ndarray().unwrap();
        assert_eq!(array.shape(), &[2, 3]);
        assert_eq!(array[[1, 0]], 3.0);

        let transposed = array.t().to_owned();
        let back = Tensor::from_ndarray(&transposed, ElementType::F16).unwrap();
        assert_eq!(back.shape(), &[3, 2]);
        assert_eq!(back.get(&[0, 1]), 3.0);
        assert_eq!(back.as_f32_slice(), None);
    }
}
