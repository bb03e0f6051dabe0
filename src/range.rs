/// Half-open byte range `[start, end)` handed out by an
/// [`Arena`](crate::Arena).
///
/// Offsets are relative to the start of the arena's storage. A range is a
/// plain value: it does not borrow the arena and does not keep the bytes
/// alive.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    start: usize,
    end: usize,
}

impl ByteRange {
    pub(crate) const fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    /// Returns the offset of the first byte.
    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }

    /// Returns the offset one past the last byte.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.end
    }

    /// Returns the number of bytes covered.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns `true` for the ranges produced by zero-sized requests.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns `true` if the two ranges share at least one byte.
    ///
    /// Empty ranges never overlap anything.
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        !self.is_empty() && !other.is_empty() && self.start < other.end && other.start < self.end
    }
}

impl std::fmt::Debug for ByteRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ByteRange({}..{})", self.start, self.end)
    }
}

impl PartialOrd for ByteRange {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ByteRange {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.start, self.end).cmp(&(other.start, other.end))
    }
}
