//! Offset-addressed bulk writes and swap-compacting removal for dense pools.

/// Write up to `num` elements of `src` into `pool` starting at `dest_offset`,
/// overwriting existing slots and appending past the end.
///
/// `dest_offset` is clamped to the pool length so no gap is ever left.
/// Returns the number of elements written.
pub(crate) fn write_range<T: Clone>(
    pool: &mut Vec<T>,
    src: &[T],
    num: usize,
    dest_offset: usize,
) -> usize {
    let n = num.min(src.len());
    if n < num {
        log::warn!("bulk write of {} elements clamped to {} supplied", num, n);
    }
    let offset = dest_offset.min(pool.len());
    let overlap = (pool.len() - offset).min(n);
    pool[offset..offset + overlap].clone_from_slice(&src[..overlap]);
    pool.extend_from_slice(&src[overlap..n]);
    n
}

/// Clamp a removal request to the pool. Returns the half-open range removed.
pub(crate) fn removal_range(len: usize, num: usize, offset: usize) -> std::ops::Range<usize> {
    if offset >= len {
        return len..len;
    }
    offset..offset + num.min(len - offset)
}

/// Remove a contiguous run, moving tail elements into the freed slots.
///
/// Applying the same call to several pools of equal length keeps them in
/// step. Returns the new length.
pub(crate) fn swap_remove_range<T>(pool: &mut Vec<T>, num: usize, offset: usize) -> usize {
    for k in removal_range(pool.len(), num, offset).rev() {
        pool.swap_remove(k);
    }
    pool.len()
}

/// Copy up to `num` elements starting at `source_offset` into `dst`.
/// Returns the number copied.
pub(crate) fn read_range<T: Clone>(
    pool: &[T],
    dst: &mut [T],
    num: usize,
    source_offset: usize,
) -> usize {
    let range = removal_range(pool.len(), num.min(dst.len()), source_offset);
    let n = range.len();
    dst[..n].clone_from_slice(&pool[range]);
    n
}
