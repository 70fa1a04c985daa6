//! Iterator helpers.

use std::iter::Zip;

/// Zips two iterators that are required to have the same length.
///
/// Pixel and tensor copies pair up rows, channels and strides computed from separate sources.
/// Plain [`Iterator::zip`] would silently drop the tail of the longer side if those computations
/// disagree, so this asserts that both sides have the same length instead.
#[track_caller]
pub(crate) fn zip_exact<A, B>(a: A, b: B) -> Zip<A::IntoIter, B::IntoIter>
where
    A: IntoIterator,
    B: IntoIterator,
    A::IntoIter: ExactSizeIterator,
    B::IntoIter: ExactSizeIterator,
{
    let (a, b) = (a.into_iter(), b.into_iter());
    assert_eq!(
        a.len(),
        b.len(),
        "`zip_exact` called on iterators of different lengths"
    );
    a.zip(b)
}
