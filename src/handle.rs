use std::alloc::Layout;
use std::marker::PhantomData;
use std::ptr::NonNull;

use allocator_api2::alloc::{AllocError, Allocator};

use crate::arena::Bump;
use crate::{AlignMode, ArenaError, ByteRange, Result};

/// Allocation capability bound to one [`Arena`](crate::Arena).
///
/// A handle is a non-owning reference: copying it copies the reference, and
/// every copy (or [`rebind`](ArenaHandle::rebind) of it) allocates from the
/// same arena. The lifetime `'a` keeps the arena borrowed for as long as any
/// handle exists.
///
/// Implements [`Allocator`], so it can back an
/// [`allocator_api2::vec::Vec`] or any other collection generic over it.
///
/// # Example
///
/// ```
/// use fixed_arena::{Arena, ArenaHandle};
///
/// let arena: Arena<u32, 4> = Arena::aligned();
/// let ints: ArenaHandle<'_, u32> = arena.handle();
/// let bytes: ArenaHandle<'_, u8> = ints.rebind();
///
/// assert!(ints.equals(&bytes));
/// let p = ints.allocate(2).unwrap();
/// unsafe { p.write(7) };
/// assert_eq!(arena.used_bytes(), 8);
/// ```
pub struct ArenaHandle<'a, T> {
    bump: &'a Bump,
    base: NonNull<u8>,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T> ArenaHandle<'a, T> {
    pub(crate) const fn new(bump: &'a Bump, base: NonNull<u8>) -> Self {
        Self {
            bump,
            base,
            _marker: PhantomData,
        }
    }

    /// Allocates uninitialized room for `n` values of `T`.
    ///
    /// `n == 0` (and any request for a zero-sized `T`) returns a dangling,
    /// well-aligned pointer without touching the arena.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::Exhausted`] if the arena cannot fit the request,
    /// or [`ArenaError::Misaligned`] if a packed arena's cursor is not
    /// aligned for `T`. The arena is unchanged in both cases.
    pub fn allocate(&self, n: usize) -> Result<NonNull<T>> {
        if n == 0 || size_of::<T>() == 0 {
            return Ok(NonNull::dangling());
        }
        self.place(n, size_of::<T>(), align_of::<T>())
            .map(NonNull::cast)
    }

    /// Gives back room for `n` values of `T` starting at `ptr`.
    ///
    /// Reclaims the space only if it is the most recent allocation;
    /// otherwise (or if `ptr` is not inside the arena) this is a no-op.
    ///
    /// # Safety
    ///
    /// `ptr` and `n` must describe an allocation made through a handle bound
    /// to the same arena, and nothing may access it afterwards.
    pub unsafe fn deallocate(&self, ptr: NonNull<T>, n: usize) {
        let bytes = n.saturating_mul(size_of::<T>());
        if let Some(range) = self.range_of(ptr.cast(), bytes) {
            self.bump.release(range);
        }
    }

    /// Returns a handle for `U` bound to the same arena.
    #[must_use]
    pub const fn rebind<U>(&self) -> ArenaHandle<'a, U> {
        ArenaHandle::new(self.bump, self.base)
    }

    /// Returns `true` if both handles allocate from the same arena.
    ///
    /// The element type plays no part in the comparison.
    #[must_use]
    pub fn equals<U>(&self, other: &ArenaHandle<'_, U>) -> bool {
        self.base == other.base
    }

    /// Checks that `other` is bound to the same arena.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::IdentityMismatch`] if the handles are bound to
    /// different arenas.
    pub fn ensure_same<U>(&self, other: &ArenaHandle<'_, U>) -> Result<()> {
        if self.equals(other) {
            Ok(())
        } else {
            tracing::debug!(
                left = ?self.base,
                right = ?other.base,
                "handle identity mismatch"
            );
            Err(ArenaError::IdentityMismatch)
        }
    }

    /// Returns the arena's capacity in bytes.
    #[must_use]
    pub const fn capacity_bytes(&self) -> usize {
        self.bump.capacity()
    }

    /// Returns the number of bytes below the arena's cursor.
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.bump.cursor()
    }

    /// Returns the number of bytes above the arena's cursor.
    #[must_use]
    pub fn remaining_bytes(&self) -> usize {
        self.bump.capacity() - self.bump.cursor()
    }

    /// Returns the arena's placement policy.
    #[must_use]
    pub const fn align_mode(&self) -> AlignMode {
        self.bump.mode()
    }

    /// Bump-allocates and turns the range into a pointer, refusing
    /// placements that are not aligned to `align`.
    fn place(&self, count: usize, size: usize, align: usize) -> Result<NonNull<u8>> {
        let range = self.bump.allocate(self.base, count, size, align)?;
        // SAFETY: range.end() <= capacity, so the start lies inside the storage.
        let ptr = unsafe { self.base.add(range.start()) };
        if ptr.as_ptr().addr() & (align - 1) != 0 {
            self.bump.release(range);
            tracing::debug!(offset = range.start(), align, "misaligned placement refused");
            return Err(self.bump.refuse(ArenaError::Misaligned {
                offset: range.start(),
                align,
            }));
        }
        Ok(ptr)
    }

    /// Clears the reason recorded for an earlier refusal.
    pub(crate) fn forget_refusal(&self) {
        self.bump.take_refusal();
    }

    /// Turns a refused request for `requested` bytes back into the error the
    /// arena reported. [`Allocator`] calls only see [`AllocError`].
    pub(crate) fn refusal(&self, requested: usize) -> ArenaError {
        match self.bump.take_refusal() {
            Some(err @ ArenaError::Misaligned { .. }) => err,
            _ => ArenaError::Exhausted {
                requested,
                offset: self.used_bytes(),
                capacity: self.capacity_bytes(),
            },
        }
    }

    /// Maps `len` bytes at `ptr` back to an arena range, if they lie inside it.
    fn range_of(&self, ptr: NonNull<u8>, len: usize) -> Option<ByteRange> {
        let start = ptr.as_ptr().addr().checked_sub(self.base.as_ptr().addr())?;
        let end = start.checked_add(len)?;
        (end <= self.bump.capacity()).then_some(ByteRange::new(start, end))
    }

    /// Moves a block to a fresh allocation, copying `copy_len` bytes.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads of `copy_len` bytes and currently
    /// allocated with `old_layout` through this arena.
    unsafe fn relocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
        copy_len: usize,
    ) -> std::result::Result<NonNull<[u8]>, AllocError> {
        let new_ptr = Allocator::allocate(self, new_layout)?;
        // SAFETY: the new block lies past the cursor, so it cannot overlap the
        // old one; both are valid for copy_len bytes.
        unsafe {
            std::ptr::copy_nonoverlapping(ptr.as_ptr(), new_ptr.cast::<u8>().as_ptr(), copy_len);
            Allocator::deallocate(self, ptr, old_layout);
        }
        Ok(new_ptr)
    }
}

// SAFETY: blocks point into the arena's storage, which the `'a` borrow keeps
// alive and in place for as long as any handle exists. Copies share the same
// arena, so a block from one copy can be freed through another. Ranges handed
// out are disjoint until released.
unsafe impl<T> Allocator for ArenaHandle<'_, T> {
    fn allocate(&self, layout: Layout) -> std::result::Result<NonNull<[u8]>, AllocError> {
        if layout.size() == 0 {
            let dangling =
                NonNull::new(std::ptr::without_provenance_mut::<u8>(layout.align())).ok_or(AllocError)?;
            return Ok(NonNull::slice_from_raw_parts(dangling, 0));
        }
        let ptr = self
            .place(1, layout.size(), layout.align())
            .map_err(|_| AllocError)?;
        Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if let Some(range) = self.range_of(ptr, layout.size()) {
            self.bump.release(range);
        }
    }

    unsafe fn grow(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> std::result::Result<NonNull<[u8]>, AllocError> {
        if old_layout.size() > 0
            && ptr.as_ptr().addr() & (new_layout.align() - 1) == 0
            && let Some(range) = self.range_of(ptr, old_layout.size())
            && let Some(new_end) = range.start().checked_add(new_layout.size())
            && self.bump.resize_top(range.end(), new_end)
        {
            return Ok(NonNull::slice_from_raw_parts(ptr, new_layout.size()));
        }
        // SAFETY: the caller guarantees ptr is allocated with old_layout.
        unsafe { self.relocate(ptr, old_layout, new_layout, old_layout.size()) }
    }

    unsafe fn shrink(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> std::result::Result<NonNull<[u8]>, AllocError> {
        if ptr.as_ptr().addr() & (new_layout.align() - 1) != 0 {
            // SAFETY: the caller guarantees ptr is allocated with old_layout,
            // and new_layout.size() <= old_layout.size().
            return unsafe { self.relocate(ptr, old_layout, new_layout, new_layout.size()) };
        }
        if let Some(range) = self.range_of(ptr, old_layout.size()) {
            self.bump
                .resize_top(range.end(), range.start() + new_layout.size());
        }
        Ok(NonNull::slice_from_raw_parts(ptr, new_layout.size()))
    }
}

impl<T> Clone for ArenaHandle<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ArenaHandle<'_, T> {}

impl<T, U> PartialEq<ArenaHandle<'_, U>> for ArenaHandle<'_, T> {
    fn eq(&self, other: &ArenaHandle<'_, U>) -> bool {
        self.equals(other)
    }
}

impl<T> Eq for ArenaHandle<'_, T> {}

impl<T> std::fmt::Debug for ArenaHandle<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ArenaHandle({:p}, {}/{} bytes)",
            self.base,
            self.bump.cursor(),
            self.bump.capacity()
        )
    }
}
