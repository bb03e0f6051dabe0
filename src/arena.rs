use std::cell::{Cell, UnsafeCell};
use std::mem::MaybeUninit;
use std::ptr::NonNull;

use crate::{ArenaError, ArenaHandle, ByteRange, Checkpoint, Result};

/// Minimum alignment of every arena's storage, in bytes.
///
/// An arena whose slot type is more strictly aligned uses that alignment
/// instead.
pub const MAX_ALIGN: usize = 16;

/// Placement policy of an [`Arena`], fixed at construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AlignMode {
    /// Allocations are placed back-to-back with no padding.
    ///
    /// Raw byte ranges may start at any offset. Typed allocations through an
    /// [`ArenaHandle`] refuse placements that would be misaligned for the
    /// element type instead of handing them out.
    Packed,
    /// Every allocation starts at an address that is a multiple of the
    /// requested alignment.
    ///
    /// Alignments above the storage alignment are tied to the arena's
    /// current address; see [`Arena::allocate`].
    #[default]
    Aligned,
}

#[repr(C, align(16))]
struct Region<U, const N: usize>([MaybeUninit<U>; N]);

/// Cursor bookkeeping shared by an arena and every handle bound to it.
pub(crate) struct Bump {
    cursor: Cell<usize>,
    capacity: usize,
    mode: AlignMode,
    /// Why the most recent refused request was refused.
    refusal: Cell<Option<ArenaError>>,
}

impl Bump {
    const fn new(capacity: usize, mode: AlignMode) -> Self {
        Self {
            cursor: Cell::new(0),
            capacity,
            mode,
            refusal: Cell::new(None),
        }
    }

    pub(crate) const fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor.get()
    }

    pub(crate) const fn mode(&self) -> AlignMode {
        self.mode
    }

    /// Reserves `count * elem_size` bytes past the cursor.
    ///
    /// `base` is the address of the storage the offsets are relative to; it
    /// is only used to round the cursor in [`AlignMode::Aligned`].
    pub(crate) fn allocate(
        &self,
        base: NonNull<u8>,
        count: usize,
        elem_size: usize,
        elem_align: usize,
    ) -> Result<ByteRange> {
        assert!(
            elem_align.is_power_of_two(),
            "alignment {elem_align} is not a power of two",
        );
        let cursor = self.cursor.get();
        if count == 0 {
            return Ok(ByteRange::new(cursor, cursor));
        }

        let start = match self.mode {
            AlignMode::Packed => Some(cursor),
            AlignMode::Aligned => {
                let addr = base.as_ptr().addr().wrapping_add(cursor);
                cursor.checked_add(addr.wrapping_neg() & (elem_align - 1))
            }
        };
        match (start, count.checked_mul(elem_size)) {
            (Some(start), Some(needed))
                if start <= self.capacity && needed <= self.capacity - start =>
            {
                let end = start + needed;
                self.cursor.set(end);
                Ok(ByteRange::new(start, end))
            }
            _ => {
                let requested = count.saturating_mul(elem_size);
                let offset = start.unwrap_or(cursor);
                tracing::debug!(
                    requested,
                    offset,
                    capacity = self.capacity,
                    "arena exhausted"
                );
                Err(self.refuse(ArenaError::Exhausted {
                    requested,
                    offset,
                    capacity: self.capacity,
                }))
            }
        }
    }

    /// Records `err` as the reason for the latest refusal and returns it.
    pub(crate) fn refuse(&self, err: ArenaError) -> ArenaError {
        self.refusal.set(Some(err));
        err
    }

    /// Takes the reason recorded by the latest [`refuse`](Bump::refuse).
    pub(crate) fn take_refusal(&self) -> Option<ArenaError> {
        self.refusal.take()
    }

    /// Rolls the cursor back to `range.start()` if `range` is the most
    /// recent allocation. Returns `true` if space was reclaimed.
    pub(crate) fn release(&self, range: ByteRange) -> bool {
        if range.is_empty() || range.end() != self.cursor.get() {
            return false;
        }
        tracing::trace!(start = range.start(), end = range.end(), "rolled back");
        self.cursor.set(range.start());
        true
    }

    /// Moves the end of the top allocation from `old_end` to `new_end`.
    ///
    /// Fails (returns `false`) unless `old_end` is the cursor and `new_end`
    /// fits in the capacity.
    pub(crate) fn resize_top(&self, old_end: usize, new_end: usize) -> bool {
        if old_end != self.cursor.get() || new_end > self.capacity {
            return false;
        }
        tracing::trace!(old_end, new_end, "resized top allocation in place");
        self.cursor.set(new_end);
        true
    }
}

/// Fixed-capacity bump arena with inline storage.
///
/// Holds `N` slots of `U` (`N * size_of::<U>()` bytes) directly inside the
/// value, never on the heap. Allocation advances a cursor; only the most
/// recent allocation can be given back.
///
/// The storage is aligned to at least [`MAX_ALIGN`]. Use [`ByteArena`] for
/// a plain byte-sized arena.
///
/// # Example
///
/// ```
/// use fixed_arena::{AlignMode, ByteArena};
///
/// let arena: ByteArena<16> = ByteArena::new(AlignMode::Aligned);
/// let a = arena.allocate(1, 1, 1).unwrap();
/// let b = arena.allocate(2, 4, 4).unwrap();
///
/// assert_eq!((a.start(), a.end()), (0, 1));
/// assert_eq!((b.start(), b.end()), (4, 12));
/// assert!(arena.allocate(1, 8, 8).is_err());
/// assert_eq!(arena.used_bytes(), 12);
/// ```
///
/// # Threads
///
/// The cursor is a [`Cell`]: an arena is `!Sync` and cannot be shared
/// between threads without external synchronization.
pub struct Arena<U, const N: usize> {
    bump: Bump,
    storage: UnsafeCell<Region<U, N>>,
}

/// Arena of `BYTES` bytes.
pub type ByteArena<const BYTES: usize> = Arena<u8, BYTES>;

impl<U, const N: usize> Arena<U, N> {
    /// Creates an empty arena with the given placement policy.
    #[must_use]
    pub const fn new(mode: AlignMode) -> Self {
        Self {
            bump: Bump::new(N * size_of::<U>(), mode),
            storage: UnsafeCell::new(Region([const { MaybeUninit::uninit() }; N])),
        }
    }

    /// Creates an empty [`AlignMode::Packed`] arena.
    #[must_use]
    pub const fn packed() -> Self {
        Self::new(AlignMode::Packed)
    }

    /// Creates an empty [`AlignMode::Aligned`] arena.
    #[must_use]
    pub const fn aligned() -> Self {
        Self::new(AlignMode::Aligned)
    }

    /// Allocates `count` elements of `elem_size` bytes aligned to
    /// `elem_align` (alignment is ignored in [`AlignMode::Packed`]).
    ///
    /// A zero `count` returns an empty range at the cursor and allocates
    /// nothing.
    ///
    /// [`AlignMode::Aligned`] rounds the address, not the offset. Up to the
    /// storage alignment (at least [`MAX_ALIGN`]) the two agree, so the
    /// range stays aligned wherever the arena is moved. Above it, the
    /// padding depends on where the arena currently lives, and a range is
    /// only aligned for as long as the arena is not moved.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::Exhausted`] if the request does not fit. The
    /// arena is unchanged in that case.
    ///
    /// # Panics
    ///
    /// Panics if `elem_align` is not a power of two.
    pub fn allocate(&self, count: usize, elem_size: usize, elem_align: usize) -> Result<ByteRange> {
        self.bump.allocate(self.base(), count, elem_size, elem_align)
    }

    /// Gives `range` back to the arena.
    ///
    /// Space is only reclaimed if `range` ends at the cursor (the most
    /// recent live allocation); any other range is ignored.
    ///
    /// # Safety
    ///
    /// `range` must have been returned by [`allocate`](Arena::allocate) on
    /// this arena, and nothing may access its bytes afterwards.
    pub unsafe fn deallocate(&self, range: ByteRange) {
        self.bump.release(range);
    }

    /// Returns a pointer to the first byte of `range`.
    ///
    /// # Panics
    ///
    /// Panics if `range` extends past the arena's capacity.
    #[must_use]
    pub fn ptr_at(&self, range: ByteRange) -> NonNull<u8> {
        assert!(
            range.end() <= self.bump.capacity(),
            "range {range:?} beyond capacity {}",
            self.bump.capacity(),
        );
        // SAFETY: range.start() <= capacity, so the offset stays within the
        // storage allocation (or one past its end).
        unsafe { self.base().add(range.start()) }
    }

    /// Returns a handle for allocating `T` values from this arena.
    #[must_use]
    pub fn handle<T>(&self) -> ArenaHandle<'_, T> {
        ArenaHandle::new(&self.bump, self.base())
    }

    /// Returns the capacity in bytes.
    #[must_use]
    pub const fn capacity_bytes(&self) -> usize {
        self.bump.capacity()
    }

    /// Returns the capacity in `U` slots.
    #[must_use]
    pub const fn element_capacity(&self) -> usize {
        N
    }

    /// Returns the number of bytes below the cursor, padding included.
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.bump.cursor()
    }

    /// Returns the number of bytes above the cursor.
    #[must_use]
    pub fn remaining_bytes(&self) -> usize {
        self.bump.capacity() - self.bump.cursor()
    }

    /// Returns `true` if nothing is allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bump.cursor() == 0
    }

    /// Returns the placement policy.
    #[must_use]
    pub const fn align_mode(&self) -> AlignMode {
        self.bump.mode()
    }

    /// Saves the current cursor.
    ///
    /// Use with [`rollback`](Arena::rollback) to release everything
    /// allocated after this point.
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint::from_offset(self.bump.cursor())
    }

    /// Rolls the cursor back to a previous checkpoint.
    ///
    /// Requires `&mut self`, so no handle or container can still be using
    /// the released bytes.
    ///
    /// # Panics
    ///
    /// Panics if `cp` points beyond the current cursor.
    pub fn rollback(&mut self, cp: Checkpoint) {
        let cursor = self.bump.cursor();
        assert!(
            cp.offset() <= cursor,
            "checkpoint {} beyond current cursor {cursor}",
            cp.offset(),
        );
        tracing::trace!(from = cursor, to = cp.offset(), "checkpoint rollback");
        self.bump.cursor.set(cp.offset());
    }

    /// Releases every allocation.
    pub fn reset(&mut self) {
        self.bump.cursor.set(0);
    }

    pub(crate) fn base(&self) -> NonNull<u8> {
        // SAFETY: UnsafeCell::get never returns null.
        unsafe { NonNull::new_unchecked(self.storage.get().cast::<u8>()) }
    }
}

impl<U, const N: usize> Default for Arena<U, N> {
    fn default() -> Self {
        Self::new(AlignMode::default())
    }
}

impl<U, const N: usize> std::fmt::Debug for Arena<U, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("capacity_bytes", &self.capacity_bytes())
            .field("used_bytes", &self.used_bytes())
            .field("align_mode", &self.align_mode())
            .finish()
    }
}
