use allocator_api2::vec::Vec;

use crate::{Arena, ArenaError, ArenaHandle, Result};

/// Growable array whose buffer lives in a borrowed [`Arena`].
///
/// A thin wrapper around [`allocator_api2::vec::Vec`] parameterized over an
/// [`ArenaHandle`]. Every operation that may allocate is fallible and
/// reports [`ArenaError::Exhausted`] instead of aborting.
///
/// Growth first asks for the amortized capacity, then falls back to the
/// exact amount, so the last bytes of the arena remain usable. When the
/// buffer is the arena's most recent allocation it grows in place.
///
/// # Example
///
/// ```
/// use fixed_arena::{ArenaVec, ByteArena};
///
/// let arena: ByteArena<1024> = ByteArena::aligned();
/// let mut v = ArenaVec::with_capacity(10, arena.handle()).unwrap();
/// for i in 0..10 {
///     v.try_push(f64::from(i) * 2.5).unwrap();
/// }
///
/// assert_eq!(v.len(), 10);
/// assert_eq!(arena.used_bytes(), 80);
/// ```
pub struct ArenaVec<'a, T> {
    inner: Vec<T, ArenaHandle<'a, T>>,
}

impl<'a, T> ArenaVec<'a, T> {
    /// Creates an empty vector allocating through `handle`.
    ///
    /// Does not allocate.
    #[must_use]
    pub fn new(handle: ArenaHandle<'a, T>) -> Self {
        Self {
            inner: Vec::new_in(handle),
        }
    }

    /// Creates an empty vector allocating from `arena`.
    #[must_use]
    pub fn new_in<U, const N: usize>(arena: &'a Arena<U, N>) -> Self {
        Self::new(arena.handle())
    }

    /// Creates a vector with room for exactly `capacity` items.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::Exhausted`] if the arena cannot fit the buffer.
    pub fn with_capacity(capacity: usize, handle: ArenaHandle<'a, T>) -> Result<Self> {
        let mut vec = Self::new(handle);
        vec.try_reserve_exact(capacity)?;
        Ok(vec)
    }

    /// Reserves room for at least `additional` more items.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::Exhausted`] if neither the amortized nor the
    /// exact capacity fits in the arena, or [`ArenaError::Misaligned`] if a
    /// packed arena's cursor is not aligned for `T`. The vector is unchanged.
    pub fn try_reserve(&mut self, additional: usize) -> Result<()> {
        if self.inner.try_reserve(additional).is_ok() {
            return Ok(());
        }
        self.try_reserve_exact(additional)
    }

    /// Reserves room for exactly `additional` more items.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::Exhausted`] if the arena cannot fit the buffer,
    /// or [`ArenaError::Misaligned`] if a packed arena's cursor is not
    /// aligned for `T`.
    pub fn try_reserve_exact(&mut self, additional: usize) -> Result<()> {
        let handle = *self.inner.allocator();
        handle.forget_refusal();
        self.inner
            .try_reserve_exact(additional)
            .map_err(|_| handle.refusal(additional.saturating_mul(size_of::<T>())))
    }

    /// Appends `value`.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::Exhausted`] if the buffer is full and cannot
    /// grow. `value` is dropped in that case; reserve first and use
    /// [`push_within_capacity`](ArenaVec::push_within_capacity) to keep it.
    pub fn try_push(&mut self, value: T) -> Result<()> {
        if self.inner.len() == self.inner.capacity() {
            self.try_reserve(1)?;
        }
        self.inner.push(value);
        Ok(())
    }

    /// Appends `value` without growing the buffer.
    ///
    /// # Errors
    ///
    /// Returns `Err(value)` if the buffer is full.
    pub fn push_within_capacity(&mut self, value: T) -> std::result::Result<(), T> {
        if self.inner.len() == self.inner.capacity() {
            return Err(value);
        }
        self.inner.push(value);
        Ok(())
    }

    /// Inserts `value` at `index`, shifting later items right.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::Exhausted`] if the buffer is full and cannot
    /// grow. `value` is dropped in that case.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn try_insert(&mut self, index: usize, value: T) -> Result<()> {
        let len = self.inner.len();
        assert!(
            index <= len,
            "insertion index {index} out of bounds for length {len}",
        );
        if len == self.inner.capacity() {
            self.try_reserve(1)?;
        }
        self.inner.insert(index, value);
        Ok(())
    }

    /// Appends clones of every item in `items`.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::Exhausted`] if the items do not fit. Nothing is
    /// appended in that case.
    pub fn try_extend_from_slice(&mut self, items: &[T]) -> Result<()>
    where
        T: Clone,
    {
        self.try_reserve(items.len())?;
        self.inner.extend_from_slice(items);
        Ok(())
    }

    /// Removes and returns the last item.
    pub fn pop(&mut self) -> Option<T> {
        self.inner.pop()
    }

    /// Removes the item at `index`, shifting later items left.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn remove(&mut self, index: usize) -> T {
        self.inner.remove(index)
    }

    /// Removes the item at `index`, replacing it with the last item.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn swap_remove(&mut self, index: usize) -> T {
        self.inner.swap_remove(index)
    }

    /// Drops every item past `len`.
    pub fn truncate(&mut self, len: usize) {
        self.inner.truncate(len);
    }

    /// Drops every item. Capacity is retained.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Shrinks the buffer to the current length.
    ///
    /// Returns the tail to the arena if the buffer is its most recent
    /// allocation.
    pub fn shrink_to_fit(&mut self) {
        self.inner.shrink_to_fit();
    }

    /// Returns the number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the vector holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of items the buffer can hold without growing.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Returns the items as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        self.inner.as_slice()
    }

    /// Returns the items as a mutable slice.
    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.inner.as_mut_slice()
    }

    /// Returns a copy of the handle this vector allocates through.
    #[must_use]
    pub fn handle(&self) -> ArenaHandle<'a, T> {
        *self.inner.allocator()
    }

    /// Exchanges contents with `other`.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::IdentityMismatch`] if the two vectors allocate
    /// from different arenas. Neither vector is touched in that case.
    pub fn try_swap(&mut self, other: &mut Self) -> Result<()> {
        self.handle().ensure_same(&other.handle())?;
        std::mem::swap(&mut self.inner, &mut other.inner);
        Ok(())
    }

}

impl<T> std::ops::Deref for ArenaVec<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> std::ops::DerefMut for ArenaVec<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<'s, T> IntoIterator for &'s ArenaVec<'_, T> {
    type Item = &'s T;
    type IntoIter = std::slice::Iter<'s, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'s, T> IntoIterator for &'s mut ArenaVec<'_, T> {
    type Item = &'s mut T;
    type IntoIter = std::slice::IterMut<'s, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ArenaVec<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
