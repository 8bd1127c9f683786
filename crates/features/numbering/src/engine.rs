use crate::allocator::{GapAllowed, GapFree, NumberAllocator, Strategy, Usage};
use crate::batch::Batch;
use crate::error::{NumberingError, suppress};
use crate::selector;
use chrono::NaiveDate;
use nseries_domain::{LineKey, Series, SeriesLine};
use nseries_kernel::calendar::{FixedCalendar, SystemCalendar, WorkDate};
use nseries_store::{LineRepository, SequenceStore};
use private::Sealed;
use std::ops::Deref;
use std::sync::Arc;
use tracing::debug;

/// The internal shared state of a [`NoSeries`] handle.
#[derive(Debug)]
pub struct NoSeriesInner<R> {
    repository: R,
    gap_free: GapFree,
    gap_allowed: GapAllowed,
    calendar: Arc<dyn WorkDate>,
}

/// The number-series engine.
///
/// Cheap to clone; every clone shares the repository, the counters and the calendar.
/// Mutating calls take the caller's transaction explicitly. Everything else reads
/// committed state and never blocks.
///
/// # Example
///
/// ```rust
/// use chrono::NaiveDate;
/// use nseries_domain::{Series, SeriesLine};
/// use nseries_numbering::{NoSeries, NumberingError};
/// use nseries_store::{MemoryStore, Transaction};
///
/// # fn main() -> Result<(), NumberingError> {
/// let start = NaiveDate::from_ymd_opt(2024, 1, 1);
/// let store = MemoryStore::builder()
///     .series(Series::new("SALES", "Sales invoices"))
///     .line(SeriesLine::new("SALES", 10000, start, "S00001"))
///     .build()?;
/// let engine = NoSeries::builder().repository(store).build();
///
/// let date = NaiveDate::from_ymd_opt(2024, 3, 1);
/// let mut tx = engine.begin();
/// assert_eq!(engine.get_next_no(&mut tx, "SALES", date, false)?, "S00001");
/// assert_eq!(engine.get_next_no(&mut tx, "SALES", date, false)?, "S00002");
/// tx.commit()?;
///
/// assert_eq!(engine.peek_next_no("SALES", date)?, "S00003");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct NoSeries<R> {
    inner: Arc<NoSeriesInner<R>>,
}

impl<R> Clone for NoSeries<R> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<R> Deref for NoSeries<R> {
    type Target = NoSeriesInner<R>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl NoSeries<()> {
    #[must_use = "The engine is not usable until you set a repository and call .build()"]
    pub fn builder() -> NoSeriesBuilder {
        NoSeriesBuilder::default()
    }
}

impl<R: LineRepository> NoSeries<R> {
    #[must_use]
    pub fn repository(&self) -> &R {
        &self.inner.repository
    }

    #[must_use]
    pub fn sequences(&self) -> &SequenceStore {
        self.inner.gap_allowed.sequences()
    }

    /// The caller's current working date, used whenever a usage date is left out.
    #[must_use]
    pub fn work_date(&self) -> NaiveDate {
        self.calendar.work_date()
    }

    /// Starts a transaction for gap-free allocations.
    #[must_use]
    pub fn begin(&self) -> R::Tx {
        self.repository.begin()
    }

    /// Loads a series definition.
    ///
    /// # Errors
    /// Returns [`NumberingError::SeriesNotFound`] for unknown codes.
    pub fn series(&self, code: &str) -> Result<Series, NumberingError> {
        self.repository.series(code).map_err(|e| NumberingError::from_lookup(code, e))
    }

    /// Lines of `code` as allocation sees them: gap-allowed lines carry their counter's
    /// last number and date.
    ///
    /// # Errors
    /// Returns [`NumberingError::SeriesNotFound`] for unknown codes.
    pub fn lines(&self, code: &str) -> Result<Vec<SeriesLine>, NumberingError> {
        self.repository
            .lines(code)
            .map_err(|e| NumberingError::from_lookup(code, e))?
            .into_iter()
            .map(|line| self.effective(line))
            .collect()
    }

    /// A single line as allocation sees it.
    ///
    /// # Errors
    /// Returns [`NumberingError::Store`] for unknown keys.
    pub fn line(&self, key: &LineKey) -> Result<SeriesLine, NumberingError> {
        self.effective(self.repository.line(key)?)
    }

    /// Finds the line of `code` that applies on `date` (default: the work date).
    /// Returns `Ok(None)` instead of a suppressible error when `suppress` is set.
    ///
    /// # Errors
    /// - [`NumberingError::NoOpenLine`] or [`NumberingError::OrderingViolation`] unless
    ///   suppressed.
    /// - [`NumberingError::SeriesNotFound`] always.
    pub fn select_line(
        &self,
        code: &str,
        date: Option<NaiveDate>,
        suppress_errors: bool,
    ) -> Result<Option<SeriesLine>, NumberingError> {
        let date = self.usage_date(date);
        suppress(self.resolve(code, date).map(|(_, line)| Some(line)), suppress_errors)
    }

    /// Allocates the next number of `code` on `date` (default: the work date).
    /// Returns an empty string instead of a suppressible error when `suppress` is set.
    ///
    /// Gap-free lines keep the line row locked until `tx` ends and are rolled back with it.
    /// Gap-allowed numbers are consumed immediately.
    ///
    /// # Errors
    /// - [`NumberingError::NoOpenLine`], [`NumberingError::RangeExhausted`],
    ///   [`NumberingError::OrderingViolation`] unless suppressed.
    /// - Configuration and storage errors always.
    pub fn get_next_no(
        &self,
        tx: &mut R::Tx,
        code: &str,
        date: Option<NaiveDate>,
        suppress_errors: bool,
    ) -> Result<String, NumberingError> {
        let date = self.usage_date(date);
        let result = self.resolve(code, date).and_then(|(series, line)| {
            let usage = Usage { date, date_order: series.date_order() };
            self.allocator(&line).allocate(&self.repository, tx, &line, usage)
        });
        suppress(result, suppress_errors)
    }

    /// Allocates the next number from a specific line, skipping selection. Date order
    /// and the ending number are still enforced.
    ///
    /// # Errors
    /// Same as [`NoSeries::get_next_no`].
    pub fn get_next_no_for_line(
        &self,
        tx: &mut R::Tx,
        key: &LineKey,
        date: Option<NaiveDate>,
        suppress_errors: bool,
    ) -> Result<String, NumberingError> {
        let date = self.usage_date(date);
        let result = self.line(key).and_then(|line| {
            let series = self.series(&line.series)?;
            let usage = Usage { date, date_order: series.date_order() };
            self.allocator(&line).allocate(&self.repository, tx, &line, usage)
        });
        suppress(result, suppress_errors)
    }

    /// The number [`NoSeries::get_next_no`] would return right now, without writing
    /// anything and without taking a lock.
    ///
    /// # Errors
    /// Same as [`NoSeries::get_next_no`] with suppression off.
    pub fn peek_next_no(&self, code: &str, date: Option<NaiveDate>) -> Result<String, NumberingError> {
        let date = self.usage_date(date);
        let (_, line) = self.resolve(code, date)?;
        self.allocator(&line).peek_next(&line)
    }

    /// The last number handed out from the line of `code` that applies on `date`.
    ///
    /// # Errors
    /// Same as [`NoSeries::select_line`] with suppression off.
    pub fn get_last_no_used(
        &self,
        code: &str,
        date: Option<NaiveDate>,
    ) -> Result<Option<String>, NumberingError> {
        let date = self.usage_date(date);
        let (_, line) = self.resolve(code, date)?;
        self.allocator(&line).last_no_used(&line)
    }

    /// The last number handed out from a specific line.
    ///
    /// # Errors
    /// Returns [`NumberingError::Store`] for unknown keys.
    pub fn last_no_used(&self, key: &LineKey) -> Result<Option<String>, NumberingError> {
        Ok(self.line(key)?.last_no_used)
    }

    /// Whether the line of `code` that applies on `date` may skip numbers.
    ///
    /// # Errors
    /// Same as [`NoSeries::select_line`] with suppression off.
    pub fn may_produce_gaps(&self, code: &str, date: Option<NaiveDate>) -> Result<bool, NumberingError> {
        let date = self.usage_date(date);
        let (_, line) = self.resolve(code, date)?;
        Ok(Strategy::of(&line) == Strategy::GapAllowed)
    }

    /// Checks that `document_no` is exactly the number `code` would hand out next.
    ///
    /// # Errors
    /// Returns [`NumberingError::PostingOrder`] on a mismatch, or any error of
    /// [`NoSeries::peek_next_no`].
    pub fn verify_posting_order(
        &self,
        code: &str,
        date: Option<NaiveDate>,
        document_no: &str,
    ) -> Result<(), NumberingError> {
        let expected = self.peek_next_no(code, date)?;
        if expected != document_no {
            return Err(NumberingError::PostingOrder {
                series: code.into(),
                expected,
                actual: document_no.to_owned(),
                context: None,
            });
        }
        Ok(())
    }

    /// Re-seeds the counter of a gap-allowed line from its row, e.g. after the row's
    /// numbers were edited by configuration.
    ///
    /// # Errors
    /// Returns [`NumberingError::Store`] for unknown keys and
    /// [`NumberingError::InvalidNumber`] for malformed codes.
    pub fn restart_sequence(&self, key: &LineKey) -> Result<(), NumberingError> {
        let line = self.repository.line(key)?;
        let counter = self.gap_allowed.restart(&line)?;
        debug!(line = %key, next = counter.peek(), "Gap-allowed line restarted");
        Ok(())
    }

    /// A batch that caches lines and allocates in memory until [`Batch::save_state`].
    #[must_use]
    pub fn batch(&self) -> Batch<R> {
        Batch::new(self.clone(), false)
    }

    /// A batch that never writes anything, for previews.
    #[must_use]
    pub fn simulation(&self) -> Batch<R> {
        Batch::new(self.clone(), true)
    }

    pub(crate) fn usage_date(&self, date: Option<NaiveDate>) -> NaiveDate {
        date.unwrap_or_else(|| self.work_date())
    }

    pub(crate) fn effective(&self, line: SeriesLine) -> Result<SeriesLine, NumberingError> {
        match Strategy::of(&line) {
            Strategy::GapFree => Ok(line),
            Strategy::GapAllowed => self.gap_allowed.overlay(line),
        }
    }

    pub(crate) fn allocator(&self, line: &SeriesLine) -> &dyn NumberAllocator<R> {
        match Strategy::of(line) {
            Strategy::GapFree => &self.gap_free,
            Strategy::GapAllowed => &self.gap_allowed,
        }
    }

    pub(crate) fn gap_allowed(&self) -> &GapAllowed {
        &self.inner.gap_allowed
    }

    fn resolve(&self, code: &str, date: NaiveDate) -> Result<(Series, SeriesLine), NumberingError> {
        let series = self.series(code)?;
        let lines = self.lines(code)?;
        let line = selector::select_line(&series, &lines, date)?.clone();
        Ok((series, line))
    }
}

#[derive(Debug, Default)]
pub struct NoRepository;
#[derive(Debug)]
pub struct WithRepository<R>(R);

mod private {
    pub trait Sealed {}
}
impl Sealed for NoRepository {}
impl<R> Sealed for WithRepository<R> {}

/// Configures and assembles a [`NoSeries`] engine.
#[allow(private_bounds)]
#[derive(Debug)]
pub struct NoSeriesBuilder<S: Sealed = NoRepository> {
    state: S,
    sequences: SequenceStore,
    calendar: Option<Arc<dyn WorkDate>>,
}

impl Default for NoSeriesBuilder<NoRepository> {
    fn default() -> Self {
        Self { state: NoRepository, sequences: SequenceStore::default(), calendar: None }
    }
}

#[allow(private_bounds)]
impl<S: Sealed> NoSeriesBuilder<S> {
    /// Source of the default usage date. Defaults to the local system date.
    #[must_use = "Sets the calendar that supplies the default usage date"]
    pub fn calendar(mut self, calendar: Arc<dyn WorkDate>) -> Self {
        self.calendar = Some(calendar);
        self
    }

    /// Pins the default usage date.
    #[must_use = "Sets a fixed work date"]
    pub fn work_date(self, date: NaiveDate) -> Self {
        self.calendar(Arc::new(FixedCalendar::new(date)))
    }

    /// Shares gap-allowed counters with other engines over the same repository.
    #[must_use = "Sets the counter registry for gap-allowed lines"]
    pub fn sequences(mut self, sequences: SequenceStore) -> Self {
        self.sequences = sequences;
        self
    }

    fn transition<N: Sealed>(self, state: N) -> NoSeriesBuilder<N> {
        NoSeriesBuilder { state, sequences: self.sequences, calendar: self.calendar }
    }
}

impl NoSeriesBuilder<NoRepository> {
    #[must_use = "Sets the line repository the engine allocates from"]
    pub fn repository<R: LineRepository>(self, repository: R) -> NoSeriesBuilder<WithRepository<R>> {
        self.transition(WithRepository(repository))
    }
}

impl<R: LineRepository> NoSeriesBuilder<WithRepository<R>> {
    #[must_use = "The engine must be kept to allocate numbers"]
    pub fn build(self) -> NoSeries<R> {
        let calendar = self.calendar.unwrap_or_else(|| Arc::new(SystemCalendar));
        NoSeries {
            inner: Arc::new(NoSeriesInner {
                repository: self.state.0,
                gap_free: GapFree,
                gap_allowed: GapAllowed::new(self.sequences),
                calendar,
            }),
        }
    }
}
