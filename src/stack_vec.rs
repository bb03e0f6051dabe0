use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::ptr::NonNull;

use allocator_api2::vec::Vec;

use crate::{AlignMode, Arena, ArenaError, ArenaHandle, BufferView, Result};

/// Fixed-capacity vector that owns its arena.
///
/// Holds an [`Arena<T, N>`] inline and a [`Vec`] allocated from it through an
/// [`ArenaHandle`]. The full capacity of `N` items is reserved once, at
/// construction, so no later operation ever asks the arena for memory:
/// pushing into a full `StackVec` returns [`ArenaError::Exhausted`].
///
/// The vector's buffer is stored as an offset into the arena and the `Vec`
/// is rebuilt around the arena's current address on every mutation, so a
/// `StackVec` can be moved freely. It is not [`Clone`].
///
/// # Example
///
/// ```
/// use fixed_arena::{ArenaError, StackVec};
///
/// let mut v: StackVec<i32, 3> = StackVec::new();
/// v.push(1).unwrap();
/// v.push(2).unwrap();
/// v.push(3).unwrap();
///
/// assert!(matches!(v.push(4), Err(ArenaError::Exhausted { .. })));
/// assert_eq!(v.as_slice(), &[1, 2, 3]);
/// assert_eq!(v.iter().sum::<i32>(), 6);
/// ```
pub struct StackVec<T, const N: usize> {
    arena: Arena<T, N>,
    /// Byte offset of the reserved buffer, `None` when it occupies no bytes.
    offset: Option<usize>,
    /// Capacity the inner `Vec` reported after the reservation.
    raw_capacity: usize,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T, const N: usize> StackVec<T, N> {
    /// Creates an empty vector over an [`AlignMode::Aligned`] arena.
    ///
    /// # Panics
    ///
    /// Panics if the arena refuses the reservation, which its sizing rules out.
    #[must_use]
    pub fn new() -> Self {
        Self::with_mode(AlignMode::Aligned)
    }

    /// Creates an empty vector over an [`AlignMode::Packed`] arena.
    ///
    /// # Panics
    ///
    /// Panics if the arena refuses the reservation, which its sizing rules out.
    #[must_use]
    pub fn packed() -> Self {
        Self::with_mode(AlignMode::Packed)
    }

    /// Creates an empty vector over an arena with the given policy.
    ///
    /// # Panics
    ///
    /// Panics if the arena refuses the reservation, which its sizing rules out.
    #[must_use]
    pub fn with_mode(mode: AlignMode) -> Self {
        match Self::try_with_mode(mode) {
            Ok(vec) => vec,
            Err(err) => panic!("arena sized for {N} items refused their reservation: {err}"),
        }
    }

    /// Creates the arena, binds a handle to it, and reserves `N` items.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::Exhausted`] if the reservation does not fit.
    pub fn try_with_mode(mode: AlignMode) -> Result<Self> {
        let arena = Arena::<T, N>::new(mode);
        let (offset, raw_capacity) = {
            let handle: ArenaHandle<'_, T> = arena.handle();
            let mut vec: Vec<T, ArenaHandle<'_, T>> = Vec::new_in(handle);
            vec.try_reserve_exact(N)
                .map_err(|_| handle.refusal(N.saturating_mul(size_of::<T>())))?;
            let vec = ManuallyDrop::new(vec);
            let offset = (size_of::<T>() != 0 && vec.capacity() != 0)
                .then(|| vec.as_ptr().addr() - arena.base().as_ptr().addr());
            (offset, vec.capacity())
        };
        tracing::trace!(items = N, ?offset, ?mode, "reserved stack vector");
        Ok(Self {
            arena,
            offset,
            raw_capacity,
            len: 0,
            _marker: PhantomData,
        })
    }

    /// Appends `value`.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::Exhausted`] if the vector already holds `N`
    /// items. `value` is dropped in that case; use
    /// [`push_within_capacity`](StackVec::push_within_capacity) to get it
    /// back, or [`emplace`](StackVec::emplace) to build it only when there
    /// is room.
    pub fn push(&mut self, value: T) -> Result<()> {
        self.ensure_room(1)?;
        self.with_vec(|vec| vec.push(value));
        Ok(())
    }

    /// Appends `value` if there is room, otherwise hands it back.
    ///
    /// # Errors
    ///
    /// Returns `Err(value)` if the vector already holds `N` items.
    pub fn push_within_capacity(&mut self, value: T) -> std::result::Result<(), T> {
        if self.is_full() {
            return Err(value);
        }
        self.with_vec(|vec| vec.push(value));
        Ok(())
    }

    /// Appends the value built by `make`, which only runs if there is room.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::Exhausted`] if the vector already holds `N`
    /// items.
    pub fn emplace(&mut self, make: impl FnOnce() -> T) -> Result<&mut T> {
        self.ensure_room(1)?;
        let index = self.len;
        self.with_vec(|vec| vec.push(make()));
        Ok(&mut self.as_mut_slice()[index])
    }

    /// Inserts `value` at `index`, shifting later items right.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::Exhausted`] if the vector already holds `N`
    /// items. `value` is dropped in that case.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: usize, value: T) -> Result<()> {
        assert!(
            index <= self.len,
            "insertion index {index} out of bounds for length {}",
            self.len,
        );
        self.ensure_room(1)?;
        self.with_vec(|vec| vec.insert(index, value));
        Ok(())
    }

    /// Appends every item of `iter` until it ends or the vector is full.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::Exhausted`] at the first item that does not
    /// fit. Items appended before it are kept.
    pub fn try_extend(&mut self, iter: impl IntoIterator<Item = T>) -> Result<()> {
        for value in iter {
            self.push(value)?;
        }
        Ok(())
    }

    /// Appends clones of every item in `items`.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::Exhausted`] if the items do not all fit.
    /// Nothing is appended in that case.
    pub fn extend_from_slice(&mut self, items: &[T]) -> Result<()>
    where
        T: Clone,
    {
        self.ensure_room(items.len())?;
        self.with_vec(|vec| vec.extend_from_slice(items));
        Ok(())
    }

    /// Removes and returns the last item.
    pub fn pop(&mut self) -> Option<T> {
        self.with_vec(|vec| vec.pop())
    }

    /// Removes the item at `index`, shifting later items left.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn remove(&mut self, index: usize) -> T {
        self.check_index(index);
        self.with_vec(|vec| vec.remove(index))
    }

    /// Removes the item at `index`, replacing it with the last item.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn swap_remove(&mut self, index: usize) -> T {
        self.check_index(index);
        self.with_vec(|vec| vec.swap_remove(index))
    }

    /// Drops every item past `len`.
    pub fn truncate(&mut self, len: usize) {
        self.with_vec(|vec| vec.truncate(len));
    }

    /// Drops every item. The reservation is kept.
    pub fn clear(&mut self) {
        self.with_vec(|vec| vec.clear());
    }

    /// Returns the items as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: the first `len` items of the buffer are initialized.
        unsafe { std::slice::from_raw_parts(self.data_ptr().as_ptr(), self.len) }
    }

    /// Returns the items as a mutable slice.
    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: the first `len` items are initialized and `&mut self`
        // guarantees exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.data_ptr().as_ptr(), self.len) }
    }

    /// Returns a [`BufferView`] over the items.
    #[must_use]
    pub fn view_mut(&mut self) -> BufferView<'_, T> {
        BufferView::from(self.as_mut_slice())
    }

    /// Returns the number of items.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the vector holds no items.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if the vector holds `N` items.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.len == N
    }

    /// Returns the fixed capacity, `N`.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Returns how many more items fit.
    #[must_use]
    pub const fn remaining_capacity(&self) -> usize {
        N - self.len
    }

    /// Returns the owned arena.
    #[must_use]
    pub const fn arena(&self) -> &Arena<T, N> {
        &self.arena
    }

    /// Returns the arena's placement policy.
    #[must_use]
    pub const fn align_mode(&self) -> AlignMode {
        self.arena.align_mode()
    }

    fn ensure_room(&self, additional: usize) -> Result<()> {
        if additional <= N - self.len {
            return Ok(());
        }
        tracing::debug!(len = self.len, capacity = N, additional, "stack vector full");
        Err(ArenaError::Exhausted {
            requested: additional.saturating_mul(size_of::<T>()),
            offset: self.len * size_of::<T>(),
            capacity: self.arena.capacity_bytes(),
        })
    }

    fn check_index(&self, index: usize) {
        assert!(
            index < self.len,
            "index out of bounds: index is {index} but length is {}",
            self.len,
        );
    }

    fn data_ptr(&self) -> NonNull<T> {
        match self.offset {
            // SAFETY: the offset was taken from a block inside this arena.
            Some(offset) => unsafe { self.arena.base().add(offset).cast() },
            None => NonNull::dangling(),
        }
    }

    /// Rebuilds the inner `Vec` around the arena's current address and runs
    /// `f` on it.
    ///
    /// `len` is zeroed while `f` runs: a panic leaks the items instead of
    /// dropping them twice.
    fn with_vec<R>(&mut self, f: impl FnOnce(&mut Vec<T, ArenaHandle<'_, T>>) -> R) -> R {
        let len = std::mem::take(&mut self.len);
        let ptr = self.data_ptr();
        // SAFETY: ptr and raw_capacity describe the block reserved from this
        // arena at construction, its first `len` items are initialized, and
        // ManuallyDrop keeps the Vec from handing the block back.
        let mut vec = ManuallyDrop::new(unsafe {
            Vec::from_raw_parts_in(ptr.as_ptr(), len, self.raw_capacity, self.arena.handle())
        });
        let out = f(&mut vec);
        debug_assert_eq!(vec.capacity(), self.raw_capacity);
        self.len = vec.len();
        out
    }
}

impl<T, const N: usize> Drop for StackVec<T, N> {
    fn drop(&mut self) {
        let items: *mut [T] = self.as_mut_slice();
        // SAFETY: the items are initialized, owned, and never touched again.
        unsafe { std::ptr::drop_in_place(items) }
    }
}

impl<T, const N: usize> Default for StackVec<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> std::ops::Deref for StackVec<T, N> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, const N: usize> std::ops::DerefMut for StackVec<T, N> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<'a, T, const N: usize> IntoIterator for &'a StackVec<T, N> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, const N: usize> IntoIterator for &'a mut StackVec<T, N> {
    type Item = &'a mut T;
    type IntoIter = std::slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T: PartialEq, const N: usize> PartialEq for StackVec<T, N> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: std::fmt::Debug, const N: usize> std::fmt::Debug for StackVec<T, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
