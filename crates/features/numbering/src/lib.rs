//! # Number Series
//!
//! Hands out unique, sequential, formatted document numbers from configured series.
//!
//! ## Architecture
//!
//! 1.  **Line selection ([`selector`]):** a series is split into dated lines; the open line
//!     with the latest starting date not after the usage date applies.
//! 2.  **Allocation ([`allocator`]):** each line picks its strategy through `allow_gaps`.
//!     [`GapFree`] serialises callers on the line row and rolls back with the caller's
//!     transaction; [`GapAllowed`] draws from a counter that never waits on a transaction
//!     and never gives a number back.
//! 3.  **Peek:** the same selection followed by a read-only computation of the next number.
//! 4.  **Guards and relationships:** manual-entry and automatic-assignment checks, and
//!     related series a caller may pick instead of the primary one.
//! 5.  **Batches ([`Batch`]):** cached bulk allocation with an explicit save.
//!
//! ## Errors
//!
//! Every fallible call returns [`NumberingError`]. Calls taking `suppress_errors` turn
//! exhaustion and date-order failures into an empty result; configuration and storage
//! failures always propagate. [`NumberingError::kind`] groups variants.

pub mod allocator;
mod batch;
mod engine;
mod error;
pub mod format;
mod guard;
mod relationship;
pub mod selector;

pub use crate::allocator::{GapAllowed, GapFree, NumberAllocator, Strategy, Usage};
pub use crate::batch::{Batch, SavedState};
pub use crate::engine::{NoRepository, NoSeries, NoSeriesBuilder, NoSeriesInner, WithRepository};
pub use crate::error::{ErrorKind, NumberingError, NumberingErrorExt};
pub use crate::format::NumberCode;
pub use crate::guard::NUMBER_FIELD;
pub use crate::relationship::SeriesPicker;
