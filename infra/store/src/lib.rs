//! Persistence seams for number series.
//!
//! - **[`LineRepository`]**: what the allocation engine needs from a row store: committed
//!   reads, per-row exclusive locks held until the transaction ends, and a staged
//!   single-row update published on commit.
//! - **[`MemoryStore`]**: a thread-safe in-memory implementation, validated at build time.
//! - **[`SequenceStore`]**: atomic counters for gap-allowed lines, which live outside
//!   any transaction.
//!
//! # Examples
//!
//! ```rust
//! use nseries_domain::LineKey;
//! use nseries_store::SequenceStore;
//!
//! let sequences = SequenceStore::new();
//! let key = LineKey::new("WEB", 10000);
//! let counter = sequences.get_or_create(&key, || 1);
//!
//! assert_eq!(counter.take(1).ok(), Some(1));
//! assert_eq!(counter.take(1).ok(), Some(2));
//! assert_eq!(counter.peek(), 3);
//! ```

mod builder;
mod error;
mod memory;
mod repository;
mod sequence;

pub use builder::MemoryStoreBuilder;
pub use error::{StoreError, StoreErrorExt};
pub use memory::{MemoryStore, MemoryStoreInner, MemoryTransaction};
pub use repository::{LineRepository, Transaction};
pub use sequence::{Counter, SequenceStore};
