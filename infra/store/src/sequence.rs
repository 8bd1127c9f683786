//! Gap-allowed counters.
//!
//! A counter lives outside every transaction: a value handed out is consumed even if
//! the caller later rolls back. Counters are created lazily per line and seeded once.

use crate::error::StoreError;
use chrono::NaiveDate;
use fxhash::FxHashMap;
use nseries_domain::LineKey;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Numeric counter backing one gap-allowed line.
///
/// Reads are lock-free. Every move of the counter goes through `gate`, which also holds the
/// latest usage date, so a guarded draw checks, issues and records as one step.
#[derive(Debug)]
pub struct Counter {
    start: u64,
    next: AtomicU64,
    gate: Mutex<Option<NaiveDate>>,
}

impl Counter {
    /// Creates a counter whose first issued value is `start`.
    #[must_use]
    pub const fn new(start: u64) -> Self {
        Self { start, next: AtomicU64::new(start), gate: Mutex::new(None) }
    }

    /// Issues the next value and advances by `increment`.
    ///
    /// # Errors
    /// Returns [`StoreError::CounterOverflow`] when the counter cannot advance further.
    pub fn take(&self, increment: u32) -> Result<u64, StoreError> {
        let _gate = self.gate.lock();
        self.advance(increment)
    }

    /// Issues the next value only if `check` accepts it, then records `date`.
    ///
    /// `check` receives the value about to be issued and the latest usage date recorded so
    /// far. A rejected draw leaves the counter untouched, and concurrent draws record their
    /// dates in the order their values were issued.
    ///
    /// # Errors
    /// Returns whatever `check` rejects with, or [`StoreError::CounterOverflow`].
    pub fn take_checked<E>(
        &self,
        increment: u32,
        date: NaiveDate,
        check: impl FnOnce(u64, Option<NaiveDate>) -> Result<(), E>,
    ) -> Result<u64, E>
    where
        E: From<StoreError>,
    {
        let mut last_date = self.gate.lock();
        check(self.next.load(Ordering::Acquire), *last_date)?;
        let issued = self.advance(increment)?;
        if last_date.is_none_or(|seen| seen < date) {
            *last_date = Some(date);
        }
        Ok(issued)
    }

    /// Caller holds `gate`.
    fn advance(&self, increment: u32) -> Result<u64, StoreError> {
        let current = self.next.load(Ordering::Acquire);
        let next = current.checked_add(u64::from(increment)).ok_or_else(|| {
            StoreError::CounterOverflow { message: format!("{current} + {increment}").into(), context: None }
        })?;
        self.next.store(next, Ordering::Release);
        Ok(current)
    }

    /// The value the next [`Counter::take`] would issue.
    #[must_use]
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Acquire)
    }

    /// The most recently issued value, `None` if nothing was issued since seeding.
    #[must_use]
    pub fn last_issued(&self, increment: u32) -> Option<u64> {
        let next = self.peek();
        (next != self.start).then(|| next.saturating_sub(u64::from(increment)))
    }

    /// Moves the counter forward so the next issued value is at least `next`. Never
    /// moves it back.
    pub fn advance_to(&self, next: u64) {
        let _gate = self.gate.lock();
        self.next.fetch_max(next, Ordering::AcqRel);
    }

    /// Records a usage date; only later dates are kept.
    pub fn observe_date(&self, date: NaiveDate) {
        let mut last = self.gate.lock();
        if last.is_none_or(|seen| seen < date) {
            *last = Some(date);
        }
    }

    #[must_use]
    pub fn last_date(&self) -> Option<NaiveDate> {
        *self.gate.lock()
    }
}

/// Registry of gap-allowed counters keyed by line.
#[derive(Debug, Clone, Default)]
pub struct SequenceStore {
    counters: Arc<RwLock<FxHashMap<LineKey, Arc<Counter>>>>,
}

impl SequenceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter of `key`, if it was ever created.
    #[must_use]
    pub fn get(&self, key: &LineKey) -> Option<Arc<Counter>> {
        self.counters.read().get(key).cloned()
    }

    /// Counter of `key`, seeding it with `start` on first use. Concurrent first calls
    /// agree on a single counter.
    pub fn get_or_create(&self, key: &LineKey, start: impl FnOnce() -> u64) -> Arc<Counter> {
        if let Some(counter) = self.get(key) {
            return counter;
        }
        let mut counters = self.counters.write();
        Arc::clone(counters.entry(key.clone()).or_insert_with(|| {
            let start = start();
            debug!(line = %key, start, "Sequence counter seeded");
            Arc::new(Counter::new(start))
        }))
    }

    /// Replaces the counter of `key` with a fresh one starting at `start`.
    pub fn restart(&self, key: &LineKey, start: u64) -> Arc<Counter> {
        let counter = Arc::new(Counter::new(start));
        self.counters.write().insert(key.clone(), Arc::clone(&counter));
        debug!(line = %key, start, "Sequence counter restarted");
        counter
    }

    /// Drops the counter of `key`; the next use reseeds it.
    pub fn remove(&self, key: &LineKey) -> bool {
        self.counters.write().remove(key).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.counters.read().len()
    }
}
