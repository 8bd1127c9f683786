use super::{NumberAllocator, Usage, check_ending, check_warning};
use crate::error::NumberingError;
use crate::format::NumberCode;
use crate::selector::check_date_after;
use nseries_domain::SeriesLine;
use nseries_store::{Counter, LineRepository, SequenceStore};
use std::sync::Arc;
use tracing::debug;

/// Draws numbers from per-line counters that ignore transaction boundaries.
#[derive(Debug, Clone, Default)]
pub struct GapAllowed {
    sequences: SequenceStore,
}

impl GapAllowed {
    #[must_use]
    pub const fn new(sequences: SequenceStore) -> Self {
        Self { sequences }
    }

    #[must_use]
    pub const fn sequences(&self) -> &SequenceStore {
        &self.sequences
    }

    /// The counter of `line`, seeded from its last number used, else its starting number.
    ///
    /// # Errors
    /// Returns [`NumberingError::InvalidNumber`] for malformed codes.
    pub fn counter(&self, line: &SeriesLine) -> Result<Arc<Counter>, NumberingError> {
        let key = line.key();
        if let Some(counter) = self.sequences.get(&key) {
            return Ok(counter);
        }
        let start = seed(line)?;
        Ok(self.sequences.get_or_create(&key, || start))
    }

    /// Re-seeds the counter of `line` from its row.
    ///
    /// # Errors
    /// Returns [`NumberingError::InvalidNumber`] for malformed codes.
    pub fn restart(&self, line: &SeriesLine) -> Result<Arc<Counter>, NumberingError> {
        Ok(self.sequences.restart(&line.key(), seed(line)?))
    }

    /// Overlays counter state onto a committed row, so readers see what the counter
    /// actually handed out.
    ///
    /// # Errors
    /// Returns [`NumberingError::InvalidNumber`] for malformed codes.
    pub fn overlay(&self, mut line: SeriesLine) -> Result<SeriesLine, NumberingError> {
        let Some(counter) = self.sequences.get(&line.key()) else {
            return Ok(line);
        };
        if let Some(last) = counter.last_issued(line.increment_by) {
            line.last_no_used = Some(template(&line)?.with_value(last).to_string());
        }
        line.last_date_used = line.last_date_used.max(counter.last_date());
        Ok(line)
    }

    /// Takes the next number from the counter of `line`. Needs no transaction: the
    /// counter moves for good even if the caller later aborts. A draw refused for its
    /// date or for an exhausted range consumes nothing.
    ///
    /// # Errors
    /// Fails on date-order violations, exhausted ranges, malformed codes and counter
    /// overflow.
    pub fn draw(&self, line: &SeriesLine, usage: Usage) -> Result<String, NumberingError> {
        let counter = self.counter(line)?;
        let template = template(line)?;
        let value = counter.take_checked(line.increment_by, usage.date, |next, last_date| {
            if usage.date_order {
                check_date_after(&line.series, line.last_date_used.max(last_date), usage.date)?;
            }
            check_ending(line, &template.with_value(next))
        })?;

        let next = template.with_value(value);
        check_warning(line, &next);

        let number = next.to_string();
        debug!(line = %line.key(), %number, date = %usage.date, "Gap-allowed number allocated");
        Ok(number)
    }

    /// The number [`GapAllowed::draw`] would hand out right now.
    ///
    /// # Errors
    /// Fails on exhausted ranges and malformed codes.
    pub fn peek(&self, line: &SeriesLine) -> Result<String, NumberingError> {
        let value = match self.sequences.get(&line.key()) {
            Some(counter) => counter.peek(),
            None => seed(line)?,
        };
        let next = template(line)?.with_value(value);
        check_ending(line, &next)?;
        Ok(next.to_string())
    }
}

impl<R: LineRepository> NumberAllocator<R> for GapAllowed {
    fn allocate(
        &self,
        _repository: &R,
        _tx: &mut R::Tx,
        line: &SeriesLine,
        usage: Usage,
    ) -> Result<String, NumberingError> {
        self.draw(line, usage)
    }

    fn peek_next(&self, line: &SeriesLine) -> Result<String, NumberingError> {
        self.peek(line)
    }

    fn last_no_used(&self, line: &SeriesLine) -> Result<Option<String>, NumberingError> {
        Ok(self.overlay(line.clone())?.last_no_used)
    }
}

/// Shape used to render counter values: the last number used if any, else the start.
fn template(line: &SeriesLine) -> Result<NumberCode, NumberingError> {
    NumberCode::parse(line.last_no_used.as_deref().unwrap_or(&line.starting_no))
}

fn seed(line: &SeriesLine) -> Result<u64, NumberingError> {
    match &line.last_no_used {
        Some(last) => Ok(NumberCode::parse(last)?.increment(line.increment_by)?.value()),
        None => Ok(NumberCode::parse(&line.starting_no)?.value()),
    }
}
