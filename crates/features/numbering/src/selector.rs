//! Line selection: which dated sub-range of a series applies on a usage date.

use crate::error::NumberingError;
use chrono::NaiveDate;
use nseries_domain::{Series, SeriesCode, SeriesLine};
use std::cmp::Ordering;
use tracing::debug;

/// Picks the open line with the latest starting date not after `date`. Lines sharing that
/// starting date resolve to the lowest line ordinal. A blank starting date sorts before
/// every date.
///
/// # Errors
/// - [`NumberingError::NoOpenLine`] when no open line has started by `date`. The error
///   names the date when a closed line starts exactly on it.
/// - [`NumberingError::OrderingViolation`] when the series enforces date order and
///   `date` precedes the selected line's last date used.
pub fn select_line<'a>(
    series: &Series,
    lines: &'a [SeriesLine],
    date: NaiveDate,
) -> Result<&'a SeriesLine, NumberingError> {
    let selected = lines
        .iter()
        .filter(|line| line.open && line.started_by(date))
        .min_by(|a, b| precedence(a, b));

    let Some(line) = selected else {
        let closed_on_date = lines.iter().any(|line| !line.open && line.starting_date == Some(date));
        return Err(NumberingError::NoOpenLine {
            series: series.code.clone(),
            on_date: closed_on_date.then_some(date),
            context: None,
        });
    };

    if series.date_order() {
        check_date_order(line, date)?;
    }

    debug!(series = %series.code, line = line.line_no, %date, "Series line selected");
    Ok(line)
}

/// Rejects `date` if it precedes the last date used on `line`.
///
/// # Errors
/// Returns [`NumberingError::OrderingViolation`].
pub fn check_date_order(line: &SeriesLine, date: NaiveDate) -> Result<(), NumberingError> {
    check_date_after(&line.series, line.last_date_used, date)
}

/// Rejects `date` if it precedes `last_date`, the latest date used in `series`.
///
/// # Errors
/// Returns [`NumberingError::OrderingViolation`].
pub fn check_date_after(
    series: &SeriesCode,
    last_date: Option<NaiveDate>,
    date: NaiveDate,
) -> Result<(), NumberingError> {
    match last_date {
        Some(last_date) if date < last_date => Err(NumberingError::OrderingViolation {
            series: series.clone(),
            date,
            last_date,
            context: None,
        }),
        _ => Ok(()),
    }
}

/// Latest starting date first, then lowest line ordinal.
fn precedence(a: &SeriesLine, b: &SeriesLine) -> Ordering {
    b.starting_date.cmp(&a.starting_date).then_with(|| a.line_no.cmp(&b.line_no))
}
