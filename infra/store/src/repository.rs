//! The contract the allocation engine needs from whatever holds series rows.
//!
//! Reads are committed-snapshot scans that never block writers. The only write is a
//! single-row update staged inside a transaction after the row lock was taken.

use crate::error::StoreError;
use nseries_domain::{LineKey, Series, SeriesCode, SeriesLine};

/// Unit of work that scopes gap-free row updates.
///
/// Dropping an unfinished transaction rolls it back.
pub trait Transaction: Send {
    /// Monotonic identifier, unique per store instance.
    fn id(&self) -> u64;

    /// Publishes staged row updates and releases every row lock held.
    ///
    /// # Errors
    /// Returns a [`StoreError`] if staged rows vanished from the store in the meantime.
    fn commit(self) -> Result<(), StoreError>;

    /// Discards staged row updates and releases every row lock held.
    fn rollback(self);
}

/// Read/range-scan plus a single-row conditional update, as required by the engine.
pub trait LineRepository: Send + Sync {
    type Tx: Transaction;

    /// Starts a new transaction.
    fn begin(&self) -> Self::Tx;

    /// Loads a series definition.
    ///
    /// # Errors
    /// Returns [`StoreError::SeriesNotFound`] for unknown codes.
    fn series(&self, code: &str) -> Result<Series, StoreError>;

    /// Committed lines of a series, ordered by starting date, then line ordinal.
    ///
    /// # Errors
    /// Returns [`StoreError::SeriesNotFound`] for unknown codes.
    fn lines(&self, code: &str) -> Result<Vec<SeriesLine>, StoreError>;

    /// Committed state of a single line.
    ///
    /// # Errors
    /// Returns [`StoreError::LineNotFound`] for unknown keys.
    fn line(&self, key: &LineKey) -> Result<SeriesLine, StoreError>;

    /// Series configured as stand-ins for `code`, in configuration order.
    ///
    /// # Errors
    /// Returns [`StoreError::SeriesNotFound`] for unknown codes.
    fn related(&self, code: &str) -> Result<Vec<SeriesCode>, StoreError>;

    /// Takes the exclusive row lock on `key` for `tx`, waiting for the current holder's
    /// transaction to end, and returns the row as `tx` sees it (its own staged write
    /// if any, else the committed row).
    ///
    /// # Errors
    /// - [`StoreError::LineNotFound`] for unknown keys.
    /// - [`StoreError::Deadlock`] when waiting would close a cycle of waiting
    ///   transactions. `tx` keeps its other locks; roll it back and retry.
    fn lock_line(&self, tx: &mut Self::Tx, key: &LineKey) -> Result<SeriesLine, StoreError>;

    /// Stages the allocation fields (`last_no_used`, `last_date_used`) of `line` for
    /// publication on commit. Configuration fields of the stored row are left untouched.
    ///
    /// # Errors
    /// Returns [`StoreError::LockNotHeld`] unless `tx` holds the row lock on the line.
    fn stage_line(&self, tx: &mut Self::Tx, line: SeriesLine) -> Result<(), StoreError>;
}
