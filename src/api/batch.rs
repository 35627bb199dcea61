//! Splitting bulk arguments into calls and merging their results.
//!
//! A bulk argument of `K` elements becomes `⌈K/B⌉` batches of at most `B`
//! elements. Batches are contiguous, in order, and cover the input exactly
//! once. Each remembers where it started so results can be mapped back to
//! input positions.

use crate::codec::Aabb;

/// A contiguous slice of a bulk argument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Batch<'a, T> {
    /// Index of `items[0]` in the full input.
    pub offset: usize,
    pub items: &'a [T],
}

impl<'a, T> Batch<'a, T> {
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Input index range covered by this batch.
    #[inline]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.items.len()
    }
}

/// Partition `items` into batches of at most `max_size` elements.
///
/// A `max_size` of zero is treated as one.
pub fn batches<T>(items: &[T], max_size: usize) -> impl Iterator<Item = Batch<'_, T>> + '_ {
    let size = max_size.max(1);
    items.chunks(size).enumerate().map(move |(i, chunk)| Batch {
        offset: i * size,
        items: chunk,
    })
}

/// Partition two parallel slices the same way.
///
/// # Panics
///
/// Panics if the slices differ in length; callers validate that first.
pub fn paired_batches<'a, A, B>(
    left: &'a [A],
    right: &'a [B],
    max_size: usize,
) -> impl Iterator<Item = (Batch<'a, A>, Batch<'a, B>)> + 'a {
    assert_eq!(left.len(), right.len(), "parallel slices differ in length");
    batches(left, max_size).zip(batches(right, max_size))
}

/// Union of per-batch bounding boxes.
pub fn union_boxes<I: IntoIterator<Item = Aabb>>(boxes: I) -> Aabb {
    boxes
        .into_iter()
        .fold(Aabb::EMPTY, |acc, b| acc.union(&b))
}

/// Rebuild the ids of resources created in batches.
///
/// The remote allocates contiguous ids per call and returns the first one,
/// so element `i` of a batch got `base + i`. `results` pairs each batch's
/// length with its returned base id, in batch order.
pub fn expand_ids<I: IntoIterator<Item = (usize, u32)>>(results: I) -> Vec<u32> {
    let mut ids = Vec::new();
    for (len, base) in results {
        ids.extend((0..len as u32).map(|i| base.wrapping_add(i)));
    }
    ids
}
