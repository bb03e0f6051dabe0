/// Read/write lens over a buffer it does not own.
///
/// Built from a pointer and an element count (or from a mutable slice) and
/// usable wherever a slice is: iteration, indexing, sorting, searching.
///
/// # Example
///
/// ```
/// use fixed_arena::BufferView;
///
/// let mut buffer = [5, 2, 8, 1, 9];
/// let mut view = BufferView::from(&mut buffer[..]);
///
/// view.sort_unstable_by(|a, b| b.cmp(a));
/// for value in &mut view {
///     *value *= 2;
/// }
///
/// assert_eq!(view.iter().position(|&v| v == 4), Some(3));
/// assert_eq!(buffer, [18, 16, 10, 4, 2]);
/// ```
pub struct BufferView<'a, T> {
    items: &'a mut [T],
}

impl<'a, T> BufferView<'a, T> {
    /// Creates a view over `len` items starting at `data`.
    ///
    /// A zero `len` yields an empty view regardless of `data`.
    ///
    /// # Safety
    ///
    /// For a non-zero `len`, `data` must be non-null, aligned, and valid for
    /// reads and writes of `len` initialized items for `'a`, with no other
    /// access to them while the view exists.
    #[must_use]
    pub unsafe fn from_raw_parts(data: *mut T, len: usize) -> Self {
        if len == 0 {
            return Self { items: &mut [] };
        }
        // SAFETY: upheld by the caller.
        let items = unsafe { std::slice::from_raw_parts_mut(data, len) };
        Self { items }
    }

    /// Returns the number of items.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the view covers no items.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the items as a slice.
    #[must_use]
    pub const fn as_slice(&self) -> &[T] {
        self.items
    }

    /// Returns the items as a mutable slice.
    #[must_use]
    pub const fn as_mut_slice(&mut self) -> &mut [T] {
        self.items
    }

    /// Gives up the view, returning the slice for the full lifetime `'a`.
    #[must_use]
    pub fn into_slice(self) -> &'a mut [T] {
        self.items
    }
}

impl<'a, T> From<&'a mut [T]> for BufferView<'a, T> {
    fn from(items: &'a mut [T]) -> Self {
        Self { items }
    }
}

impl<T> std::ops::Deref for BufferView<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.items
    }
}

impl<T> std::ops::DerefMut for BufferView<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.items
    }
}

impl<'a, T> IntoIterator for BufferView<'a, T> {
    type Item = &'a mut T;
    type IntoIter = std::slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter_mut()
    }
}

impl<'s, T> IntoIterator for &'s BufferView<'_, T> {
    type Item = &'s T;
    type IntoIter = std::slice::Iter<'s, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<'s, T> IntoIterator for &'s mut BufferView<'_, T> {
    type Item = &'s mut T;
    type IntoIter = std::slice::IterMut<'s, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter_mut()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for BufferView<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}
