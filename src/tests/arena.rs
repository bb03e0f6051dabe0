use proptest::prelude::*;

use super::*;

#[test]
fn empty_arena() {
    let arena: ByteArena<64> = ByteArena::aligned();
    assert!(arena.is_empty());
    assert_eq!(arena.capacity_bytes(), 64);
    assert_eq!(arena.used_bytes(), 0);
    assert_eq!(arena.remaining_bytes(), 64);
    assert_eq!(arena.align_mode(), AlignMode::Aligned);
}

#[test]
fn capacity_counts_slots() {
    let arena: Arena<u32, 10> = Arena::packed();
    assert_eq!(arena.capacity_bytes(), 40);
    assert_eq!(arena.element_capacity(), 10);
}

#[test]
fn default_is_aligned() {
    let arena: ByteArena<8> = ByteArena::default();
    assert_eq!(arena.align_mode(), AlignMode::Aligned);
    assert_eq!(AlignMode::default(), AlignMode::Aligned);
}

#[test]
fn storage_is_max_aligned() {
    let arena: ByteArena<3> = ByteArena::packed();
    let range = arena.allocate(1, 1, 1).unwrap();
    assert_eq!(arena.ptr_at(range).as_ptr().addr() % MAX_ALIGN, 0);
}

#[test]
fn ten_packed_words_then_exhausted() {
    let arena: Arena<u32, 10> = Arena::packed();
    for i in 0..10 {
        let range = arena.allocate(1, 4, 4).unwrap();
        assert_eq!(range.start(), i * 4);
        assert_eq!(range.len(), 4);
    }

    let err = arena.allocate(1, 4, 4).unwrap_err();
    assert_eq!(
        err,
        ArenaError::Exhausted {
            requested: 4,
            offset: 40,
            capacity: 40,
        }
    );
    assert_eq!(arena.used_bytes(), 40);
}

#[test]
fn aligned_rounds_cursor_up() {
    let arena: ByteArena<32> = ByteArena::aligned();
    let a = arena.allocate(3, 1, 1).unwrap();
    let b = arena.allocate(1, 8, 8).unwrap();

    assert_eq!((a.start(), a.end()), (0, 3));
    assert_eq!((b.start(), b.end()), (8, 16));
    assert_eq!(arena.used_bytes(), 16);
}

#[test]
fn packed_ignores_alignment() {
    let arena: ByteArena<32> = ByteArena::packed();
    let a = arena.allocate(3, 1, 1).unwrap();
    let b = arena.allocate(1, 8, 8).unwrap();

    assert_eq!(a.end(), b.start());
    assert_eq!((b.start(), b.end()), (3, 11));
}

#[test]
fn padding_counts_against_capacity() {
    let arena: ByteArena<16> = ByteArena::aligned();
    arena.allocate(1, 1, 1).unwrap();
    // 1 + 7 padding + 8 = 16 fits, a second u64 does not.
    arena.allocate(1, 8, 8).unwrap();
    assert_eq!(arena.remaining_bytes(), 0);
    assert!(arena.allocate(1, 1, 1).is_err());
}

#[test]
fn exhausted_leaves_cursor_unchanged() {
    let arena: ByteArena<16> = ByteArena::aligned();
    arena.allocate(1, 1, 1).unwrap();

    let err = arena.allocate(2, 8, 8).unwrap_err();
    assert_eq!(
        err,
        ArenaError::Exhausted {
            requested: 16,
            offset: 8,
            capacity: 16,
        }
    );
    assert_eq!(arena.used_bytes(), 1);

    // The padded slot is still available after the failure.
    let range = arena.allocate(1, 8, 8).unwrap();
    assert_eq!(range.start(), 8);
}

#[test]
fn size_overflow_is_exhausted() {
    let arena: ByteArena<16> = ByteArena::packed();
    let err = arena.allocate(usize::MAX, 2, 1).unwrap_err();
    assert!(matches!(
        err,
        ArenaError::Exhausted {
            requested: usize::MAX,
            ..
        }
    ));
    assert!(arena.is_empty());
}

#[test]
fn zero_count_is_empty_range() {
    let arena: ByteArena<8> = ByteArena::aligned();
    arena.allocate(1, 1, 1).unwrap();

    let range = arena.allocate(0, 8, 8).unwrap();
    assert!(range.is_empty());
    assert_eq!(range.start(), 1);
    assert_eq!(arena.used_bytes(), 1);
}

#[test]
fn zero_count_on_full_arena_succeeds() {
    let arena: ByteArena<4> = ByteArena::packed();
    arena.allocate(4, 1, 1).unwrap();
    assert!(arena.allocate(0, 4, 4).unwrap().is_empty());
}

#[test]
#[should_panic(expected = "alignment 3 is not a power of two")]
fn bad_alignment_panics() {
    let arena: ByteArena<8> = ByteArena::aligned();
    let _ = arena.allocate(1, 1, 3);
}

#[test]
fn deallocate_latest_rolls_back() {
    let arena: ByteArena<32> = ByteArena::aligned();
    let a = arena.allocate(1, 4, 4).unwrap();
    let b = arena.allocate(1, 8, 8).unwrap();
    assert_eq!(arena.used_bytes(), 16);

    unsafe { arena.deallocate(b) };
    assert_eq!(arena.used_bytes(), b.start());

    // Padding between a and b is not part of either range.
    unsafe { arena.deallocate(a) };
    assert_eq!(arena.used_bytes(), 8);
}

#[test]
fn deallocate_earlier_is_noop() {
    let arena: ByteArena<32> = ByteArena::packed();
    let a = arena.allocate(4, 1, 1).unwrap();
    let _b = arena.allocate(4, 1, 1).unwrap();

    unsafe { arena.deallocate(a) };
    assert_eq!(arena.used_bytes(), 8);
}

#[test]
fn deallocate_in_reverse_unwinds_packed() {
    let arena: ByteArena<32> = ByteArena::packed();
    let a = arena.allocate(3, 1, 1).unwrap();
    let b = arena.allocate(2, 4, 4).unwrap();
    let c = arena.allocate(1, 8, 8).unwrap();

    for range in [c, b, a] {
        unsafe { arena.deallocate(range) };
        assert_eq!(arena.used_bytes(), range.start());
    }
    assert!(arena.is_empty());
}

#[test]
fn ptr_at_offsets_from_base() {
    let arena: ByteArena<16> = ByteArena::packed();
    let a = arena.allocate(3, 1, 1).unwrap();
    let b = arena.allocate(2, 1, 1).unwrap();

    let base = arena.ptr_at(a).as_ptr().addr();
    assert_eq!(arena.ptr_at(b).as_ptr().addr(), base + 3);
}

#[test]
fn aligned_offsets_survive_moves_up_to_max_align() {
    let arena: ByteArena<64> = ByteArena::aligned();
    arena.allocate(3, 1, 1).unwrap();
    let range = arena.allocate(1, 8, MAX_ALIGN).unwrap();
    assert_eq!(range.start(), MAX_ALIGN);

    let moved = Box::new(arena);
    assert_eq!(moved.ptr_at(range).as_ptr().addr() % MAX_ALIGN, 0);
}

#[test]
fn over_aligned_request_rounds_current_address() {
    let arena: ByteArena<128> = ByteArena::aligned();
    let range = arena.allocate(1, 8, 64).unwrap();

    assert!(range.start() < 64);
    assert_eq!(arena.ptr_at(range).as_ptr().addr() % 64, 0);
}

#[test]
#[should_panic(expected = "beyond capacity 16")]
fn ptr_at_foreign_range_panics() {
    let big: ByteArena<64> = ByteArena::packed();
    let small: ByteArena<16> = ByteArena::packed();
    let range = big.allocate(64, 1, 1).unwrap();
    let _ = small.ptr_at(range);
}

#[test]
fn checkpoint_rollback() {
    let mut arena: ByteArena<32> = ByteArena::aligned();
    arena.allocate(4, 1, 1).unwrap();
    let cp = arena.checkpoint();

    arena.allocate(1, 8, 8).unwrap();
    arena.allocate(2, 2, 2).unwrap();
    assert_eq!(arena.used_bytes(), 20);

    arena.rollback(cp);
    assert_eq!(arena.used_bytes(), 4);
    assert_eq!(cp.offset(), 4);
}

#[test]
fn nested_checkpoints() {
    let mut arena: ByteArena<32> = ByteArena::packed();
    let cp0 = arena.checkpoint();
    arena.allocate(1, 4, 4).unwrap();
    let cp1 = arena.checkpoint();
    arena.allocate(1, 4, 4).unwrap();

    assert!(cp0 < cp1);
    assert!(cp0.is_empty());

    arena.rollback(cp1);
    assert_eq!(arena.used_bytes(), 4);
    arena.rollback(cp0);
    assert!(arena.is_empty());
}

#[test]
#[should_panic(expected = "checkpoint 8 beyond current cursor 4")]
fn rollback_beyond_cursor_panics() {
    let mut arena: ByteArena<32> = ByteArena::packed();
    arena.allocate(8, 1, 1).unwrap();
    let cp = arena.checkpoint();
    arena.reset();
    arena.allocate(4, 1, 1).unwrap();
    arena.rollback(cp);
}

#[test]
fn reset_releases_everything() {
    let mut arena: ByteArena<16> = ByteArena::packed();
    arena.allocate(16, 1, 1).unwrap();
    assert!(arena.allocate(1, 1, 1).is_err());

    arena.reset();
    assert!(arena.is_empty());
    assert!(arena.allocate(16, 1, 1).is_ok());
}

#[test]
fn debug_output() {
    let arena: ByteArena<8> = ByteArena::packed();
    arena.allocate(3, 1, 1).unwrap();
    assert_eq!(
        format!("{arena:?}"),
        "Arena { capacity_bytes: 8, used_bytes: 3, align_mode: Packed }"
    );
    assert_eq!(format!("{:?}", arena.checkpoint()), "Checkpoint(3)");
}

#[test]
fn range_overlap() {
    let arena: ByteArena<16> = ByteArena::packed();
    let a = arena.allocate(4, 1, 1).unwrap();
    let b = arena.allocate(4, 1, 1).unwrap();
    let empty = arena.allocate(0, 1, 1).unwrap();

    assert!(!a.overlaps(&b));
    assert!(a.overlaps(&a));
    assert!(!empty.overlaps(&b));
    assert!(a < b);
    assert_eq!(format!("{a:?}"), "ByteRange(0..4)");
}

#[test]
fn error_messages() {
    let err = ArenaError::Exhausted {
        requested: 8,
        offset: 36,
        capacity: 40,
    };
    assert_eq!(
        err.to_string(),
        "arena exhausted: requested 8 bytes at offset 36, capacity 40 bytes"
    );
    assert_eq!(
        ArenaError::IdentityMismatch.to_string(),
        "handles are bound to different arenas"
    );
}

/// One raw allocation request: `(count, size, align)`.
fn request() -> impl Strategy<Value = (usize, usize, usize)> {
    (
        0usize..6,
        prop::sample::select(vec![1usize, 2, 3, 4, 8, 12, 16]),
        prop::sample::select(vec![1usize, 2, 4, 8, 16]),
    )
}

fn mode() -> impl Strategy<Value = AlignMode> {
    prop_oneof![Just(AlignMode::Packed), Just(AlignMode::Aligned)]
}

proptest! {
    #[test]
    fn allocations_follow_cursor_model(
        mode in mode(),
        requests in prop::collection::vec(request(), 1..40),
    ) {
        let arena: ByteArena<256> = ByteArena::new(mode);
        let mut live: Vec<ByteRange> = Vec::new();
        let mut cursor = 0usize;

        for (count, size, align) in requests {
            let start = match mode {
                AlignMode::Packed => cursor,
                AlignMode::Aligned => cursor.next_multiple_of(align),
            };
            let fits = start + count * size <= 256;

            match arena.allocate(count, size, align) {
                Ok(range) if count == 0 => {
                    prop_assert!(range.is_empty());
                    prop_assert_eq!(arena.used_bytes(), cursor);
                }
                Ok(range) => {
                    prop_assert!(fits);
                    prop_assert_eq!(range.start(), start);
                    prop_assert_eq!(range.len(), count * size);
                    prop_assert!(range.end() <= arena.capacity_bytes());
                    if mode == AlignMode::Aligned {
                        prop_assert_eq!(arena.ptr_at(range).as_ptr().addr() % align, 0);
                    }
                    for earlier in &live {
                        prop_assert!(!earlier.overlaps(&range));
                        prop_assert!(earlier.end() <= range.start());
                    }
                    cursor = range.end();
                    live.push(range);
                }
                Err(err) => {
                    prop_assert!(!fits);
                    let is_exhausted = matches!(err, ArenaError::Exhausted { .. });
                    prop_assert!(is_exhausted);
                    prop_assert_eq!(arena.used_bytes(), cursor);
                }
            }
        }
    }

    #[test]
    fn packed_unwinds_in_reverse(
        requests in prop::collection::vec((1usize..6, 1usize..9), 1..20),
    ) {
        let arena: ByteArena<512> = ByteArena::packed();
        let ranges: Vec<ByteRange> = requests
            .iter()
            .map(|&(count, size)| arena.allocate(count, size, 1).unwrap())
            .collect();

        for pair in ranges.windows(2) {
            prop_assert_eq!(pair[0].end(), pair[1].start());
        }
        for range in ranges.iter().rev() {
            unsafe { arena.deallocate(*range) };
            prop_assert_eq!(arena.used_bytes(), range.start());
        }
        prop_assert!(arena.is_empty());
    }

    #[test]
    fn only_the_latest_range_is_reclaimed(
        mode in mode(),
        sizes in prop::collection::vec(1usize..16, 2..10),
        pick in any::<prop::sample::Index>(),
    ) {
        let arena: ByteArena<256> = ByteArena::new(mode);
        let ranges: Vec<ByteRange> = sizes
            .iter()
            .map(|&size| arena.allocate(1, size, 4).unwrap())
            .collect();
        let before = arena.used_bytes();
        let index = pick.index(ranges.len());

        unsafe { arena.deallocate(ranges[index]) };
        if index == ranges.len() - 1 {
            prop_assert_eq!(arena.used_bytes(), ranges[index].start());
        } else {
            prop_assert_eq!(arena.used_bytes(), before);
        }
    }
}
