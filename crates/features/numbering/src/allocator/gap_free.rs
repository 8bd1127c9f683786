use super::{NumberAllocator, Usage, check_ending, check_warning, next_number};
use crate::error::NumberingError;
use crate::selector::check_date_order;
use nseries_domain::SeriesLine;
use nseries_store::LineRepository;
use tracing::debug;

/// Serialises allocations per line through the repository's row lock.
#[derive(Debug, Clone, Copy, Default)]
pub struct GapFree;

impl<R: LineRepository> NumberAllocator<R> for GapFree {
    fn allocate(
        &self,
        repository: &R,
        tx: &mut R::Tx,
        line: &SeriesLine,
        usage: Usage,
    ) -> Result<String, NumberingError> {
        // The selected snapshot may be stale; everything is decided on the locked row.
        let mut row = repository.lock_line(tx, &line.key())?;

        if usage.date_order {
            check_date_order(&row, usage.date)?;
        }
        let next = next_number(&row)?;
        check_ending(&row, &next)?;
        check_warning(&row, &next);

        let number = next.to_string();
        row.last_no_used = Some(number.clone());
        row.last_date_used = Some(usage.date);
        repository.stage_line(tx, row)?;

        debug!(line = %line.key(), %number, date = %usage.date, "Gap-free number allocated");
        Ok(number)
    }

    fn peek_next(&self, line: &SeriesLine) -> Result<String, NumberingError> {
        let next = next_number(line)?;
        check_ending(line, &next)?;
        Ok(next.to_string())
    }

    fn last_no_used(&self, line: &SeriesLine) -> Result<Option<String>, NumberingError> {
        Ok(line.last_no_used.clone())
    }
}
