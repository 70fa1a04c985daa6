//! Fallible allocation helpers.

use std::mem;

use crate::{Error, Result};

/// Allocates a vector of `len` copies of `value`, reporting allocation failure as
/// [`Error::Allocation`] instead of aborting.
pub(crate) fn try_vec<T: Clone>(what: &'static str, len: usize, value: T) -> Result<Vec<T>> {
    let bytes = len.saturating_mul(mem::size_of::<T>());
    let mut vec = Vec::new();
    vec.try_reserve_exact(len)
        .map_err(|_| Error::Allocation { what, bytes }.logged())?;
    vec.resize(len, value);
    Ok(vec)
}

/// Copies `src` into a freshly allocated vector, reporting allocation failure as
/// [`Error::Allocation`].
pub(crate) fn try_copy<T: Clone>(what: &'static str, src: &[T]) -> Result<Vec<T>> {
    let mut vec = Vec::new();
    vec.try_reserve_exact(src.len()).map_err(|_| {
        Error::Allocation {
            what,
            bytes: mem::size_of_val(src),
        }
        .logged()
    })?;
    vec.extend_from_slice(src);
    Ok(vec)
}
