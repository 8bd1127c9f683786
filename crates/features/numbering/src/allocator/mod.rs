//! Allocation strategies.
//!
//! One contract, two implementations picked by the line's `allow_gaps` flag:
//! - [`GapFree`] updates the line row under its exclusive lock inside the caller's
//!   transaction. Aborting the transaction gives the number back.
//! - [`GapAllowed`] draws from the line's counter, which is durable the moment it moves.

mod gap_allowed;
mod gap_free;

pub use gap_allowed::GapAllowed;
pub use gap_free::GapFree;

use crate::error::NumberingError;
use crate::format::NumberCode;
use chrono::NaiveDate;
use nseries_domain::SeriesLine;
use nseries_store::LineRepository;
use std::fmt::Debug;
use tracing::warn;

/// How a usage date constrains an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub date: NaiveDate,
    /// The owning series enforces non-decreasing usage dates.
    pub date_order: bool,
}

/// Which allocator serves a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    GapFree,
    GapAllowed,
}

impl Strategy {
    #[must_use]
    pub const fn of(line: &SeriesLine) -> Self {
        if line.allow_gaps { Self::GapAllowed } else { Self::GapFree }
    }
}

/// The common contract of both strategies.
pub trait NumberAllocator<R: LineRepository>: Debug + Send + Sync {
    /// Allocates the next number of `line` on behalf of `tx`.
    ///
    /// # Errors
    /// Fails when the range is exhausted, the usage date violates date order, a code is
    /// malformed, or the repository fails.
    fn allocate(
        &self,
        repository: &R,
        tx: &mut R::Tx,
        line: &SeriesLine,
        usage: Usage,
    ) -> Result<String, NumberingError>;

    /// The number [`NumberAllocator::allocate`] would yield right now, computed without
    /// writing and without taking a lock.
    ///
    /// # Errors
    /// Same as [`NumberAllocator::allocate`], minus lock and storage failures.
    fn peek_next(&self, line: &SeriesLine) -> Result<String, NumberingError>;

    /// The last number handed out from `line`, if any.
    ///
    /// # Errors
    /// Returns [`NumberingError::InvalidNumber`] for malformed codes.
    fn last_no_used(&self, line: &SeriesLine) -> Result<Option<String>, NumberingError>;
}

/// The number following `line.last_no_used`, or the starting number on a fresh line.
///
/// # Errors
/// Returns [`NumberingError::InvalidNumber`] for malformed codes.
pub fn next_number(line: &SeriesLine) -> Result<NumberCode, NumberingError> {
    match &line.last_no_used {
        Some(last) => NumberCode::parse(last)?.increment(line.increment_by),
        None => NumberCode::parse(&line.starting_no),
    }
}

/// Rejects `next` if it lies beyond the line's ending number.
///
/// # Errors
/// Returns [`NumberingError::RangeExhausted`].
pub fn check_ending(line: &SeriesLine, next: &NumberCode) -> Result<(), NumberingError> {
    let Some(ending) = &line.ending_no else {
        return Ok(());
    };
    if next.value() > NumberCode::parse(ending)?.value() {
        return Err(NumberingError::RangeExhausted {
            line: line.key(),
            next: next.to_string(),
            ending: ending.clone(),
            context: None,
        });
    }
    Ok(())
}

/// Emits a warning once `number` has reached the line's warning number.
pub fn check_warning(line: &SeriesLine, number: &NumberCode) {
    let Some(warning) = &line.warning_no else {
        return;
    };
    match NumberCode::parse(warning) {
        Ok(threshold) if number.value() >= threshold.value() => {
            warn!(
                line = %line.key(),
                number = %number,
                warning_no = %warning,
                ending_no = line.ending_no.as_deref().unwrap_or_default(),
                "Number series line is running out of numbers"
            );
        },
        Ok(_) => {},
        Err(err) => warn!(line = %line.key(), error = %err, "Unreadable warning number"),
    }
}
