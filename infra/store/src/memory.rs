//! In-memory line repository with per-row exclusive locks scoped to transactions.
//!
//! Committed tables sit behind a `RwLock` and are only ever held for the duration of a
//! scan or a publish, so readers never wait on a transaction. Row locks live in a
//! separate table guarded by a `Mutex` + `Condvar`; a transaction keeps its locks until
//! it commits, rolls back, or is dropped. A transaction whose wait would close a cycle
//! of waiters is refused with [`StoreError::Deadlock`] instead of blocking.

use crate::builder::MemoryStoreBuilder;
use crate::error::StoreError;
use crate::repository::{LineRepository, Transaction};
use fxhash::FxHashMap;
use nseries_domain::{LineKey, Series, SeriesCode, SeriesLine, SeriesRelationship};
use parking_lot::{Condvar, Mutex, RwLock};
use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// Committed rows.
#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub(crate) series: FxHashMap<SeriesCode, Series>,
    pub(crate) lines: BTreeMap<LineKey, SeriesLine>,
    pub(crate) relationships: Vec<SeriesRelationship>,
}

/// Row lock owners plus the wait-for edges used to detect deadlocks.
#[derive(Debug, Default)]
struct LockTable {
    /// Line key to owning transaction id.
    owners: FxHashMap<LineKey, u64>,
    /// Blocked transaction id to the line it waits for.
    waiting: FxHashMap<u64, LineKey>,
}

impl LockTable {
    /// Whether `tx` waiting on a lock held by `owner` closes a cycle of waiters.
    fn closes_cycle(&self, tx: u64, owner: u64) -> bool {
        let mut current = owner;
        for _ in 0..=self.waiting.len() {
            if current == tx {
                return true;
            }
            let Some(next) = self.waiting.get(&current).and_then(|key| self.owners.get(key)) else {
                return false;
            };
            current = *next;
        }
        false
    }
}

/// The internal shared state of a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryStoreInner {
    pub(crate) tables: RwLock<Tables>,
    locks: Mutex<LockTable>,
    released: Condvar,
    next_tx: AtomicU64,
}

impl MemoryStoreInner {
    pub(crate) fn new(tables: Tables) -> Self {
        Self {
            tables: RwLock::new(tables),
            locks: Mutex::new(LockTable::default()),
            released: Condvar::new(),
            next_tx: AtomicU64::new(1),
        }
    }
}

/// A thread-safe, cheaply clonable in-memory [`LineRepository`].
///
/// # Example
///
/// ```rust
/// use nseries_domain::{Series, SeriesLine};
/// use nseries_store::{LineRepository, MemoryStore, StoreError, Transaction};
///
/// # fn main() -> Result<(), StoreError> {
/// let store = MemoryStore::builder()
///     .series(Series::new("SALES", "Sales invoices"))
///     .line(SeriesLine::new("SALES", 10000, None, "S00001"))
///     .build()?;
///
/// let key = store.lines("SALES")?[0].key();
/// let mut tx = store.begin();
/// let mut row = store.lock_line(&mut tx, &key)?;
/// row.last_no_used = Some("S00001".to_owned());
/// store.stage_line(&mut tx, row)?;
/// tx.commit()?;
///
/// assert_eq!(store.line(&key)?.last_no_used.as_deref(), Some("S00001"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStore {
    pub(crate) inner: Arc<MemoryStoreInner>,
}

impl Deref for MemoryStore {
    type Target = MemoryStoreInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl MemoryStore {
    #[must_use = "The store is not usable until you call .build()"]
    pub fn builder() -> MemoryStoreBuilder {
        MemoryStoreBuilder::new()
    }

    /// Inserts or replaces a series definition.
    pub fn upsert_series(&self, series: Series) {
        debug!(series = %series.code, "Series definition stored");
        self.tables.write().series.insert(series.code.clone(), series);
    }

    /// Inserts or replaces a line, configuration and allocation fields alike.
    ///
    /// # Errors
    /// Returns [`StoreError::SeriesNotFound`] if the owning series does not exist, or
    /// [`StoreError::InvalidCatalog`] if the increment is zero.
    pub fn upsert_line(&self, line: SeriesLine) -> Result<(), StoreError> {
        crate::builder::validate_line(&line)?;
        let mut tables = self.tables.write();
        if !tables.series.contains_key(&line.series) {
            return Err(series_not_found(&line.series));
        }
        debug!(line = %line.key(), "Series line stored");
        tables.lines.insert(line.key(), line);
        Ok(())
    }

    /// Opens or retires a line. Retired lines stay in place and are skipped by selection.
    ///
    /// # Errors
    /// Returns [`StoreError::LineNotFound`] for unknown keys.
    pub fn set_line_open(&self, key: &LineKey, open: bool) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let line = tables.lines.get_mut(key).ok_or_else(|| line_not_found(key))?;
        line.open = open;
        debug!(line = %key, open, "Series line open flag changed");
        Ok(())
    }

    /// Adds a relationship between two existing series.
    ///
    /// # Errors
    /// Returns [`StoreError::SeriesNotFound`] if either side is unknown.
    pub fn add_relationship(&self, relationship: SeriesRelationship) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        for code in [&relationship.primary, &relationship.related] {
            if !tables.series.contains_key(code) {
                return Err(series_not_found(code));
            }
        }
        if !tables.relationships.contains(&relationship) {
            tables.relationships.push(relationship);
        }
        Ok(())
    }

    /// Number of row locks currently held across all transactions.
    #[must_use]
    pub fn held_locks(&self) -> usize {
        self.locks.lock().owners.len()
    }

    fn release(&self, tx_id: u64, held: &[LineKey]) {
        if held.is_empty() {
            return;
        }
        let mut locks = self.locks.lock();
        for key in held {
            if locks.owners.get(key) == Some(&tx_id) {
                locks.owners.remove(key);
            }
        }
        drop(locks);
        self.released.notify_all();
        trace!(tx = tx_id, released = held.len(), "Row locks released");
    }

    fn ensure_owned(&self, tx: &MemoryTransaction) -> Result<(), StoreError> {
        if Arc::ptr_eq(&self.inner, &tx.store.inner) {
            Ok(())
        } else {
            Err(StoreError::Internal {
                message: format!("transaction {} belongs to another store", tx.id).into(),
                context: None,
            })
        }
    }
}

impl LineRepository for MemoryStore {
    type Tx = MemoryTransaction;

    fn begin(&self) -> MemoryTransaction {
        let id = self.next_tx.fetch_add(1, Ordering::Relaxed);
        trace!(tx = id, "Transaction started");
        MemoryTransaction {
            id,
            store: self.clone(),
            held: Vec::new(),
            staged: FxHashMap::default(),
            finished: false,
        }
    }

    fn series(&self, code: &str) -> Result<Series, StoreError> {
        self.tables.read().series.get(code).cloned().ok_or_else(|| series_not_found(code))
    }

    fn lines(&self, code: &str) -> Result<Vec<SeriesLine>, StoreError> {
        let tables = self.tables.read();
        if !tables.series.contains_key(code) {
            return Err(series_not_found(code));
        }
        let from = LineKey::new(code, 0);
        let to = LineKey::new(code, u32::MAX);
        let mut lines: Vec<SeriesLine> =
            tables.lines.range(from..=to).map(|(_, line)| line.clone()).collect();
        drop(tables);

        lines.sort_by(|a, b| {
            a.starting_date.cmp(&b.starting_date).then_with(|| a.line_no.cmp(&b.line_no))
        });
        Ok(lines)
    }

    fn line(&self, key: &LineKey) -> Result<SeriesLine, StoreError> {
        self.tables.read().lines.get(key).cloned().ok_or_else(|| line_not_found(key))
    }

    fn related(&self, code: &str) -> Result<Vec<SeriesCode>, StoreError> {
        let tables = self.tables.read();
        if !tables.series.contains_key(code) {
            return Err(series_not_found(code));
        }
        Ok(tables
            .relationships
            .iter()
            .filter(|rel| rel.primary == *code)
            .map(|rel| rel.related.clone())
            .collect())
    }

    fn lock_line(
        &self,
        tx: &mut MemoryTransaction,
        key: &LineKey,
    ) -> Result<SeriesLine, StoreError> {
        self.ensure_owned(tx)?;

        if !tx.holds(key) {
            let mut locks = self.locks.lock();
            loop {
                match locks.owners.get(key).copied() {
                    None => {
                        locks.owners.insert(key.clone(), tx.id);
                        break;
                    },
                    Some(owner) if owner == tx.id => break,
                    Some(owner) if locks.closes_cycle(tx.id, owner) => {
                        locks.waiting.remove(&tx.id);
                        debug!(tx = tx.id, owner, line = %key, "Row lock wait refused, deadlock");
                        return Err(StoreError::Deadlock {
                            message: key.to_string().into(),
                            context: Some(format!("transaction {} waits on {owner}", tx.id).into()),
                        });
                    },
                    Some(owner) => {
                        trace!(tx = tx.id, owner, line = %key, "Waiting for row lock");
                        locks.waiting.insert(tx.id, key.clone());
                        self.released.wait(&mut locks);
                    },
                }
            }
            locks.waiting.remove(&tx.id);
            drop(locks);
            tx.held.push(key.clone());
        }

        if let Some(staged) = tx.staged.get(key) {
            return Ok(staged.clone());
        }
        self.line(key)
    }

    fn stage_line(&self, tx: &mut MemoryTransaction, line: SeriesLine) -> Result<(), StoreError> {
        self.ensure_owned(tx)?;
        let key = line.key();
        if !tx.holds(&key) {
            return Err(StoreError::LockNotHeld {
                message: key.to_string().into(),
                context: Some(format!("transaction {}", tx.id).into()),
            });
        }
        tx.staged.insert(key, line);
        Ok(())
    }
}

/// A transaction over a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryTransaction {
    id: u64,
    store: MemoryStore,
    held: Vec<LineKey>,
    staged: FxHashMap<LineKey, SeriesLine>,
    finished: bool,
}

impl MemoryTransaction {
    /// Whether this transaction holds the row lock on `key`.
    #[must_use]
    pub fn holds(&self, key: &LineKey) -> bool {
        self.held.contains(key)
    }

    /// Number of rows with staged allocation updates.
    #[must_use]
    pub fn staged(&self) -> usize {
        self.staged.len()
    }

    fn publish(&mut self) -> Result<(), StoreError> {
        let staged = std::mem::take(&mut self.staged);
        let mut tables = self.store.tables.write();

        if let Some(missing) = staged.keys().find(|key| !tables.lines.contains_key(*key)) {
            return Err(line_not_found(missing));
        }
        for (key, line) in staged {
            if let Some(row) = tables.lines.get_mut(&key) {
                row.last_no_used = line.last_no_used;
                row.last_date_used = line.last_date_used;
            }
        }
        Ok(())
    }

    fn finish(&mut self) {
        if !self.finished {
            self.finished = true;
            self.store.release(self.id, &self.held);
            self.held.clear();
        }
    }
}

impl Transaction for MemoryTransaction {
    fn id(&self) -> u64 {
        self.id
    }

    fn commit(mut self) -> Result<(), StoreError> {
        let staged = self.staged.len();
        let result = self.publish();
        self.finish();
        debug!(tx = self.id, staged, ok = result.is_ok(), "Transaction committed");
        result
    }

    fn rollback(mut self) {
        debug!(tx = self.id, discarded = self.staged.len(), "Transaction rolled back");
        self.staged.clear();
        self.finish();
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if !self.finished {
            trace!(tx = self.id, "Unfinished transaction dropped, rolling back");
            self.staged.clear();
            self.finish();
        }
    }
}

pub(crate) fn series_not_found(code: &str) -> StoreError {
    StoreError::SeriesNotFound { message: code.to_owned().into(), context: None }
}

pub(crate) fn line_not_found(key: &LineKey) -> StoreError {
    StoreError::LineNotFound { message: key.to_string().into(), context: None }
}
