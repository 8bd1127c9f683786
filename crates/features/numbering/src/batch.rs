//! Bulk allocation over cached lines.
//!
//! A batch loads each series once and hands out gap-free numbers from its in-memory copy
//! of the lines. Nothing reaches the store until [`Batch::save_state`], which writes every
//! touched line back through its row lock and refuses lines someone else allocated from
//! in the meantime. The batch only takes the written state as its new baseline once the
//! caller confirms the commit with [`Batch::confirm`], so a rolled back save can simply be
//! saved again. Gap-allowed lines keep drawing from their live counters, except in a
//! simulation, which computes everything in memory and never writes.

use crate::allocator::{Strategy, Usage, check_ending, check_warning, next_number};
use crate::engine::NoSeries;
use crate::error::{NumberingError, suppress};
use crate::selector;
use chrono::NaiveDate;
use fxhash::FxHashMap;
use nseries_domain::{LineKey, Series, SeriesCode, SeriesLine};
use nseries_store::{LineRepository, Transaction};
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug)]
struct CachedSeries {
    series: Series,
    lines: Vec<SeriesLine>,
}

/// Line states staged by [`Batch::save_state`], awaiting [`Batch::confirm`].
#[derive(Debug, Default)]
#[must_use = "pass to Batch::confirm once the transaction has committed"]
pub struct SavedState {
    lines: Vec<(LineKey, Option<String>)>,
}

impl SavedState {
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// See the [module documentation](self).
#[derive(Debug)]
pub struct Batch<R: LineRepository> {
    engine: NoSeries<R>,
    simulation: bool,
    cache: FxHashMap<SeriesCode, CachedSeries>,
    /// Committed `last_no_used` of each cached line, as of load or the last confirmed save.
    loaded: FxHashMap<LineKey, Option<String>>,
    /// Gap-free lines allocated from since the last confirmed save, in lock order.
    touched: BTreeSet<LineKey>,
}

impl<R: LineRepository> Batch<R> {
    pub(crate) fn new(engine: NoSeries<R>, simulation: bool) -> Self {
        Self {
            engine,
            simulation,
            cache: FxHashMap::default(),
            loaded: FxHashMap::default(),
            touched: BTreeSet::new(),
        }
    }

    #[must_use]
    pub const fn is_simulation(&self) -> bool {
        self.simulation
    }

    /// Allocates the next number of `code` from the cached lines.
    ///
    /// # Errors
    /// Same as [`NoSeries::get_next_no`].
    pub fn get_next_no(
        &mut self,
        code: &str,
        date: Option<NaiveDate>,
        suppress_errors: bool,
    ) -> Result<String, NumberingError> {
        let date = self.engine.usage_date(date);
        let result = self.allocate(code, date);
        suppress(result, suppress_errors)
    }

    /// The number [`Batch::get_next_no`] would return right now.
    ///
    /// # Errors
    /// Same as [`NoSeries::peek_next_no`].
    pub fn peek_next_no(&mut self, code: &str, date: Option<NaiveDate>) -> Result<String, NumberingError> {
        let date = self.engine.usage_date(date);
        let line = self.select(code, date)?;

        if !self.simulation && Strategy::of(&line) == Strategy::GapAllowed {
            return self.engine.gap_allowed().peek(&line);
        }
        let next = next_number(&line)?;
        check_ending(&line, &next)?;
        Ok(next.to_string())
    }

    /// The last number handed out from the cached line of `code` that applies on `date`.
    ///
    /// # Errors
    /// Same as [`NoSeries::get_last_no_used`].
    pub fn get_last_no_used(
        &mut self,
        code: &str,
        date: Option<NaiveDate>,
    ) -> Result<Option<String>, NumberingError> {
        let date = self.engine.usage_date(date);
        Ok(self.select(code, date)?.last_no_used)
    }

    /// Writes the allocation state of every touched gap-free line through `tx`. Rows are
    /// locked in key order. A simulation saves nothing.
    ///
    /// The batch's own bookkeeping is left alone: commit `tx`, then hand the returned
    /// [`SavedState`] to [`Batch::confirm`]. If `tx` rolls back instead, drop it and save
    /// again later.
    ///
    /// # Errors
    /// - [`NumberingError::Conflict`] if a line was allocated from outside this batch
    ///   since it was loaded. Lines staged before the conflict stay staged in `tx`; roll
    ///   it back to discard them.
    /// - Storage errors.
    pub fn save_state(&mut self, tx: &mut R::Tx) -> Result<SavedState, NumberingError> {
        if self.simulation {
            debug!(touched = self.touched.len(), "Simulation batch discarded on save");
            return Ok(SavedState::default());
        }

        let repository = self.engine.repository();
        let mut saved = SavedState::default();
        for key in &self.touched {
            let Some(cached) = self.cache.get(&key.series).and_then(|c| c.line(key.line_no)) else {
                continue;
            };
            let mut row = repository.lock_line(tx, key)?;
            let loaded = self.loaded.get(key).cloned().flatten();
            if row.last_no_used != loaded {
                return Err(NumberingError::Conflict { line: key.clone(), context: None });
            }

            row.last_no_used.clone_from(&cached.last_no_used);
            row.last_date_used = cached.last_date_used;
            debug!(line = %key, last_no_used = row.last_no_used.as_deref().unwrap_or_default(), "Batch line staged");
            saved.lines.push((key.clone(), row.last_no_used.clone()));
            repository.stage_line(tx, row)?;
        }
        Ok(saved)
    }

    /// Adopts a committed save as the batch's new baseline. Lines allocated from again
    /// after the save stay pending for the next one.
    pub fn confirm(&mut self, saved: SavedState) {
        for (key, last_no_used) in saved.lines {
            let unchanged = self
                .cache
                .get(&key.series)
                .and_then(|c| c.line(key.line_no))
                .is_some_and(|line| line.last_no_used == last_no_used);
            if unchanged {
                self.touched.remove(&key);
            }
            self.loaded.insert(key, last_no_used);
        }
    }

    /// Saves through `tx`, commits it and confirms the save. On any failure `tx` is rolled
    /// back and the batch can be saved again.
    ///
    /// # Errors
    /// Same as [`Batch::save_state`], plus commit failures.
    pub fn commit_state(&mut self, mut tx: R::Tx) -> Result<(), NumberingError> {
        let saved = match self.save_state(&mut tx) {
            Ok(saved) => saved,
            Err(err) => {
                tx.rollback();
                return Err(err);
            },
        };
        tx.commit()?;
        debug!(lines = saved.len(), "Batch state committed");
        self.confirm(saved);
        Ok(())
    }

    /// Forgets every cached series; the next call reloads committed state.
    pub fn clear(&mut self) {
        self.cache.clear();
        self.loaded.clear();
        self.touched.clear();
    }

    fn allocate(&mut self, code: &str, date: NaiveDate) -> Result<String, NumberingError> {
        let live = !self.simulation;
        let gap_allowed = self.engine.gap_allowed().clone();
        let (series, line) = self.select_mut(code, date)?;
        let usage = Usage { date, date_order: series.date_order() };

        let number = if live && Strategy::of(line) == Strategy::GapAllowed {
            gap_allowed.draw(line, usage)?
        } else {
            if usage.date_order {
                selector::check_date_order(line, date)?;
            }
            let next = next_number(line)?;
            check_ending(line, &next)?;
            check_warning(line, &next);
            next.to_string()
        };

        line.last_no_used = Some(number.clone());
        line.last_date_used = Some(date);
        let key = line.key();
        if Strategy::of(line) == Strategy::GapFree {
            self.touched.insert(key.clone());
        }
        debug!(line = %key, %number, simulation = !live, "Batch number allocated");
        Ok(number)
    }

    fn select(&mut self, code: &str, date: NaiveDate) -> Result<SeriesLine, NumberingError> {
        Ok(self.select_mut(code, date)?.1.clone())
    }

    fn select_mut(
        &mut self,
        code: &str,
        date: NaiveDate,
    ) -> Result<(&Series, &mut SeriesLine), NumberingError> {
        let cached = self.load(code)?;
        let line_no = selector::select_line(&cached.series, &cached.lines, date)?.line_no;
        let CachedSeries { series, lines } = cached;
        let line = lines
            .iter_mut()
            .find(|line| line.line_no == line_no)
            .ok_or_else(|| NumberingError::from(format!("cached line {code}#{line_no} vanished")))?;
        Ok((series, line))
    }

    fn load(&mut self, code: &str) -> Result<&mut CachedSeries, NumberingError> {
        if !self.cache.contains_key(code) {
            let series = self.engine.series(code)?;
            let lines = self.engine.lines(code)?;
            for line in &lines {
                self.loaded.insert(line.key(), line.last_no_used.clone());
            }
            debug!(series = %series.code, lines = lines.len(), "Series cached for batch");
            self.cache.insert(series.code.clone(), CachedSeries { series, lines });
        }
        self.cache
            .get_mut(code)
            .ok_or_else(|| NumberingError::from(format!("series {code} missing from batch cache")))
    }
}

impl CachedSeries {
    fn line(&self, line_no: u32) -> Option<&SeriesLine> {
        self.lines.iter().find(|line| line.line_no == line_no)
    }
}
