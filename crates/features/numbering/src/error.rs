use chrono::NaiveDate;
use nseries_domain::{LineKey, SeriesCode};
use nseries_store::StoreError;
use std::borrow::Cow;
use tracing::debug;

/// Error types of the allocation engine.
///
/// Only range exhaustion and ordering violations are `#[suppressible]`; configuration
/// and storage failures always propagate, whatever the caller asked for.
#[nseries_derive::nseries_error]
pub enum NumberingError {
    #[error("Manual numbers are not allowed for series '{series}' in field {field}{}{}", format_document(.document), format_context(.context))]
    ManualNotAllowed {
        series: SeriesCode,
        field: Cow<'static, str>,
        document: Option<String>,
        context: Option<Cow<'static, str>>,
    },

    #[error("Automatic numbers are not allowed for series '{series}'{}", format_context(.context))]
    AutomaticNotAllowed { series: SeriesCode, context: Option<Cow<'static, str>> },

    #[error("Number series '{series}' does not exist{}", format_context(.context))]
    SeriesNotFound { series: SeriesCode, context: Option<Cow<'static, str>> },

    #[error("Invalid number '{number}'{}: {message}", format_context(.context))]
    InvalidNumber {
        number: String,
        message: Cow<'static, str>,
        context: Option<Cow<'static, str>>,
    },

    #[suppressible]
    #[error("You cannot assign new numbers from series '{series}'{}{}", format_on_date(.on_date), format_context(.context))]
    NoOpenLine {
        series: SeriesCode,
        on_date: Option<NaiveDate>,
        context: Option<Cow<'static, str>>,
    },

    #[suppressible]
    #[error("Series line {line} is exhausted: next number {next} exceeds ending number {ending}{}", format_context(.context))]
    RangeExhausted {
        line: LineKey,
        next: String,
        ending: String,
        context: Option<Cow<'static, str>>,
    },

    #[suppressible]
    #[error("Usage date {date} of series '{series}' precedes the last date used {last_date}{}", format_context(.context))]
    OrderingViolation {
        series: SeriesCode,
        date: NaiveDate,
        last_date: NaiveDate,
        context: Option<Cow<'static, str>>,
    },

    #[error("Document '{actual}' is posted out of order in series '{series}', expected '{expected}'{}", format_context(.context))]
    PostingOrder {
        series: SeriesCode,
        expected: String,
        actual: String,
        context: Option<Cow<'static, str>>,
    },

    #[error("Series line {line} was changed by another caller{}", format_context(.context))]
    Conflict { line: LineKey, context: Option<Cow<'static, str>> },

    #[error("Storage failure{}: {source}", format_context(.context))]
    Store { source: StoreError, context: Option<Cow<'static, str>> },

    #[error("Internal numbering error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

/// Coarse classification of a [`NumberingError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller asked for something the series configuration forbids.
    Configuration,
    /// No open line applies, or the applicable line ran out of numbers.
    Exhaustion,
    /// A date-ordered series was asked to go back in time.
    OrderingViolation,
    PostingOrder,
    /// Another caller got in the way: a batch's lines moved, or a row lock wait would
    /// deadlock. Roll back and retry.
    Conflict,
    Storage,
    Internal,
}

impl NumberingError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ManualNotAllowed { .. }
            | Self::AutomaticNotAllowed { .. }
            | Self::SeriesNotFound { .. }
            | Self::InvalidNumber { .. } => ErrorKind::Configuration,
            Self::NoOpenLine { .. } | Self::RangeExhausted { .. } => ErrorKind::Exhaustion,
            Self::OrderingViolation { .. } => ErrorKind::OrderingViolation,
            Self::PostingOrder { .. } => ErrorKind::PostingOrder,
            Self::Conflict { .. } | Self::Store { source: StoreError::Deadlock { .. }, .. } => {
                ErrorKind::Conflict
            },
            Self::Store { .. } => ErrorKind::Storage,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Lifts a store lookup failure for `series` into the configuration taxonomy.
    pub(crate) fn from_lookup(series: &str, source: StoreError) -> Self {
        match source {
            StoreError::SeriesNotFound { context, .. } => {
                Self::SeriesNotFound { series: series.into(), context }
            },
            other => other.into(),
        }
    }
}

/// Degrades suppressible failures to `T::default()` when `suppress` is set.
pub(crate) fn suppress<T: Default>(
    result: Result<T, NumberingError>,
    suppress: bool,
) -> Result<T, NumberingError> {
    match result {
        Err(err) if suppress && err.is_suppressible() => {
            debug!(error = %err, "Numbering error suppressed");
            Ok(T::default())
        },
        other => other,
    }
}

fn format_document(document: &Option<String>) -> Cow<'static, str> {
    document.as_ref().map_or(Cow::Borrowed(""), |d| Cow::Owned(format!(" (document {d})")))
}

fn format_on_date(on_date: &Option<NaiveDate>) -> Cow<'static, str> {
    on_date.map_or(Cow::Borrowed(""), |d| Cow::Owned(format!(" on {d}")))
}
