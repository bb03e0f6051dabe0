//! Fixed-capacity bump arena with no heap allocation.
//!
//! `fixed-arena` provides an inline byte arena, allocation handles that
//! plug it into generic collections, and containers built on top of them.
//!
//! # Types
//!
//! - [`Arena<U, N>`] — `N` slots of `U` stored inline, a bump cursor, and
//!   stack-discipline deallocation
//! - [`ArenaHandle<'a, T>`] — copyable allocation capability bound to one
//!   arena; implements [`allocator_api2::alloc::Allocator`]
//! - [`ArenaVec<'a, T>`] — growable vector borrowing an arena
//! - [`StackVec<T, N>`] — fixed-capacity vector owning its arena, reserved
//!   in full at construction
//! - [`SequentialRunner`] / [`FanOutRunner`] — inline step runners with
//!   early-exit and run-all semantics
//! - [`BufferView`] — non-owning lens over a pointer and a length
//!
//! # Key properties
//!
//! - **No heap**: storage lives inside the arena value
//! - **Typed failure**: running out of room is [`ArenaError::Exhausted`],
//!   never an abort or a dangling pointer
//! - **Stack discipline**: giving back the most recent allocation rewinds
//!   the cursor; anything else is a no-op
//! - **Single-threaded**: arenas are `!Sync` and handles are `!Send`
//!
//! # Example
//!
//! ```
//! use fixed_arena::{AlignMode, ArenaError, StackVec};
//!
//! let mut points: StackVec<(f32, f32, f32), 2> = StackVec::with_mode(AlignMode::Packed);
//! points.push((1.0, 2.0, 3.0)).unwrap();
//! points.emplace(|| (4.0, 5.0, 6.0)).unwrap();
//!
//! assert!(points.is_full());
//! assert!(matches!(
//!     points.push((7.0, 8.0, 9.0)),
//!     Err(ArenaError::Exhausted { .. })
//! ));
//! assert_eq!(points[1].2, 6.0);
//! ```

#![deny(missing_docs)]

mod arena;
mod checkpoint;
mod error;
mod fan_out;
mod handle;
mod range;
mod sequential;
mod stack_vec;
mod step;
mod vec;
mod view;

pub use arena::{AlignMode, Arena, ByteArena, MAX_ALIGN};
pub use checkpoint::Checkpoint;
pub use error::{ArenaError, Result};
pub use fan_out::FanOutRunner;
pub use handle::ArenaHandle;
pub use range::ByteRange;
pub use sequential::SequentialRunner;
pub use stack_vec::StackVec;
pub use step::{Outcome, Step};
pub use vec::ArenaVec;
pub use view::BufferView;

#[cfg(test)]
mod tests;
