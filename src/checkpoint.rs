/// Saved arena cursor for rollback.
///
/// Created by [`Arena::checkpoint`](crate::Arena::checkpoint). Rolling back
/// to a checkpoint releases every byte allocated after it and keeps
/// everything before.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Checkpoint {
    offset: usize,
}

impl Checkpoint {
    pub(crate) const fn from_offset(offset: usize) -> Self {
        Self { offset }
    }

    /// Returns the saved cursor offset in bytes.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Returns `true` if the checkpoint was taken on an empty arena.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.offset == 0
    }
}

impl std::fmt::Debug for Checkpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Checkpoint({})", self.offset)
    }
}
