//! Allocation choke point and the growable buffer built on top of it.
//!
//! Every growth, shrink and release of a backing buffer in the workspace goes
//! through [`reallocate`]: chunk code/lines/constants, string payloads and the
//! heap registry itself. A failed allocation is not recoverable; the stack
//! machine has nothing to unwind to, so the process aborts.

use core::{mem, ops::Index, slice};

/// Smallest non-zero capacity handed out by [`grow_capacity`].
pub const MIN_CAPACITY: usize = 8;

/// Growth law shared by every buffer: `max(8, 2 * capacity)`.
#[must_use]
pub const fn grow_capacity(capacity: usize) -> usize {
    let doubled = capacity.saturating_mul(2);
    if doubled < MIN_CAPACITY { MIN_CAPACITY } else { doubled }
}

/// Resize the storage of `buffer` from `old_capacity` to `new_capacity` elements.
///
/// - `new_capacity == 0` frees the storage (and drops any remaining elements).
/// - otherwise the storage holds exactly `new_capacity` slots afterwards and
///   the overlapping prefix of the old content is preserved.
///
/// Aborts the process if the allocator cannot satisfy the request.
pub fn reallocate<T>(buffer: &mut Vec<T>, old_capacity: usize, new_capacity: usize) {
    let elem = mem::size_of::<T>();
    tracing::trace!(
        old_size = old_capacity.saturating_mul(elem),
        new_size = new_capacity.saturating_mul(elem),
        "reallocate"
    );

    if new_capacity == 0 {
        *buffer = Vec::new();
        return;
    }

    if new_capacity < buffer.len() {
        buffer.truncate(new_capacity);
    }

    if new_capacity > buffer.capacity() {
        let additional = new_capacity - buffer.len();
        if buffer.try_reserve_exact(additional).is_err() {
            out_of_memory(new_capacity.saturating_mul(elem));
        }
    } else {
        buffer.shrink_to(new_capacity);
    }
}

/// Fresh allocation of exactly `capacity` slots.
#[must_use]
pub fn allocate<T>(capacity: usize) -> Vec<T> {
    let mut buffer = Vec::new();
    reallocate(&mut buffer, 0, capacity);
    buffer
}

/// Release the storage of `buffer`. Returns the number of bytes freed.
pub fn free<T>(buffer: &mut Vec<T>) -> usize {
    let capacity = buffer.capacity();
    reallocate(buffer, capacity, 0);
    capacity.saturating_mul(mem::size_of::<T>())
}

fn out_of_memory(bytes: usize) -> ! {
    tracing::error!(bytes, "allocation failed, aborting");
    std::process::abort()
}

/* ─────────────────────────── GrowableBuffer ─────────────────────────── */

/// Append-only array with geometric growth.
///
/// `capacity` follows [`grow_capacity`] exactly, independently of whatever
/// slack the system allocator might add, so `0 <= len <= capacity` and the
/// capacity is always 0 or at least [`MIN_CAPACITY`].
#[derive(Debug, Clone)]
pub struct GrowableBuffer<T> {
    data: Vec<T>,
    capacity: usize,
}

impl<T> Default for GrowableBuffer<T> {
    fn default() -> Self { Self::new() }
}

impl<T> GrowableBuffer<T> {
    /// Empty buffer, no storage.
    #[must_use]
    pub const fn new() -> Self { Self { data: Vec::new(), capacity: 0 } }

    /// Append `value`, growing first if the buffer is full.
    pub fn push(&mut self, value: T) {
        if self.data.len() == self.capacity {
            let old = self.capacity;
            self.capacity = grow_capacity(old);
            reallocate(&mut self.data, old, self.capacity);
        }
        self.data.push(value);
    }

    /// Free the storage and return to the zero state.
    pub fn release(&mut self) {
        reallocate(&mut self.data, self.capacity, 0);
        self.capacity = 0;
    }

    /// Number of elements in use.
    #[must_use]
    pub fn len(&self) -> usize { self.data.len() }

    /// Number of slots allocated.
    #[must_use]
    pub const fn capacity(&self) -> usize { self.capacity }

    /// Whether no element was pushed since the last release.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.data.is_empty() }

    /// Elements as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] { &self.data }

    /// Elements as a mutable slice (in-place updates only, no removal).
    pub fn as_mut_slice(&mut self) -> &mut [T] { &mut self.data }

    /// Element at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> { self.data.get(index) }

    /// Last element, if any.
    #[must_use]
    pub fn last(&self) -> Option<&T> { self.data.last() }

    /// Iterate over the elements in insertion order.
    pub fn iter(&self) -> slice::Iter<'_, T> { self.data.iter() }
}

impl<T> Index<usize> for GrowableBuffer<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T { &self.data[index] }
}

impl<'a, T> IntoIterator for &'a GrowableBuffer<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter { self.iter() }
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn growth_law() {
        assert_eq!(grow_capacity(0), 8);
        assert_eq!(grow_capacity(8), 16);
        assert_eq!(grow_capacity(16), 32);
        assert_eq!(grow_capacity(usize::MAX), usize::MAX);
    }

    #[test]
    fn capacities_follow_the_law() {
        let mut buf = GrowableBuffer::new();
        assert_eq!(buf.capacity(), 0);
        let mut seen = Vec::new();
        for i in 0..40u32 {
            buf.push(i);
            if seen.last() != Some(&buf.capacity()) {
                seen.push(buf.capacity());
            }
        }
        assert_eq!(seen, vec![8, 16, 32, 64]);
        assert_eq!(buf.len(), 40);
    }

    #[test]
    fn release_resets() {
        let mut buf = GrowableBuffer::new();
        buf.push(1u8);
        buf.push(2u8);
        buf.release();
        assert_eq!(buf.len(), 0);
        assert_eq!(buf.capacity(), 0);
        assert!(buf.is_empty());
        buf.push(3u8);
        assert_eq!(buf.as_slice(), &[3]);
        assert_eq!(buf.capacity(), 8);
    }

    #[test]
    fn reallocate_preserves_prefix() {
        let mut v = vec![1, 2, 3, 4];
        reallocate(&mut v, 4, 32);
        assert!(v.capacity() >= 32);
        assert_eq!(v, vec![1, 2, 3, 4]);
        reallocate(&mut v, 32, 2);
        assert_eq!(v, vec![1, 2]);
        reallocate(&mut v, 2, 0);
        assert!(v.is_empty());
        assert_eq!(v.capacity(), 0);
    }

    #[test]
    fn allocate_and_free() {
        let mut v: Vec<u64> = allocate(10);
        assert!(v.capacity() >= 10);
        assert!(v.is_empty());
        let freed = free(&mut v);
        assert!(freed >= 80);
        assert_eq!(v.capacity(), 0);
    }

    proptest! {
        #[test]
        fn growth_never_alters_data(values in proptest::collection::vec(any::<i32>(), 0..300)) {
            let mut buf = GrowableBuffer::new();
            let mut prev_capacity = 0usize;
            for (i, v) in values.iter().enumerate() {
                buf.push(*v);
                prop_assert_eq!(buf.len(), i + 1);
                if buf.capacity() != prev_capacity {
                    prop_assert_eq!(buf.capacity(), core::cmp::max(8, prev_capacity * 2));
                    prev_capacity = buf.capacity();
                }
                prop_assert!(buf.len() <= buf.capacity());
            }
            prop_assert_eq!(buf.as_slice(), values.as_slice());
        }
    }
}
