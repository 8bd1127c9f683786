use crate::series::SeriesCode;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Primary key of a [`SeriesLine`]: the owning series plus the line ordinal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineKey {
    pub series: SeriesCode,
    pub line_no: u32,
}

impl LineKey {
    pub fn new(series: impl Into<SeriesCode>, line_no: u32) -> Self {
        Self { series: series.into(), line_no }
    }
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.series, self.line_no)
    }
}

/// A dated sub-range of a series.
///
/// `last_no_used` and `last_date_used` belong to the allocator; everything else
/// is configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesLine {
    pub series: SeriesCode,
    pub line_no: u32,
    /// `None` applies from the beginning of time and sorts before every date.
    #[serde(default)]
    pub starting_date: Option<NaiveDate>,
    pub starting_no: String,
    #[serde(default)]
    pub ending_no: Option<String>,
    #[serde(default)]
    pub warning_no: Option<String>,
    #[serde(default)]
    pub last_no_used: Option<String>,
    #[serde(default)]
    pub last_date_used: Option<NaiveDate>,
    #[serde(default = "default_increment")]
    pub increment_by: u32,
    #[serde(default)]
    pub allow_gaps: bool,
    #[serde(default = "default_open")]
    pub open: bool,
}

const fn default_increment() -> u32 {
    1
}

const fn default_open() -> bool {
    true
}

impl SeriesLine {
    /// Creates an open, gap-free line incrementing by one.
    pub fn new(
        series: impl Into<SeriesCode>,
        line_no: u32,
        starting_date: Option<NaiveDate>,
        starting_no: impl Into<String>,
    ) -> Self {
        Self {
            series: series.into(),
            line_no,
            starting_date,
            starting_no: starting_no.into(),
            ending_no: None,
            warning_no: None,
            last_no_used: None,
            last_date_used: None,
            increment_by: default_increment(),
            allow_gaps: false,
            open: default_open(),
        }
    }

    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey { series: self.series.clone(), line_no: self.line_no }
    }

    #[must_use]
    pub fn with_ending_no(mut self, ending_no: impl Into<String>) -> Self {
        self.ending_no = Some(ending_no.into());
        self
    }

    #[must_use]
    pub fn with_warning_no(mut self, warning_no: impl Into<String>) -> Self {
        self.warning_no = Some(warning_no.into());
        self
    }

    #[must_use]
    pub fn with_last_used(mut self, last_no_used: impl Into<String>, last_date_used: Option<NaiveDate>) -> Self {
        self.last_no_used = Some(last_no_used.into());
        self.last_date_used = last_date_used;
        self
    }

    #[must_use]
    pub const fn with_increment(mut self, increment_by: u32) -> Self {
        self.increment_by = increment_by;
        self
    }

    #[must_use]
    pub const fn with_gaps(mut self, allow_gaps: bool) -> Self {
        self.allow_gaps = allow_gaps;
        self
    }

    #[must_use]
    pub const fn with_open(mut self, open: bool) -> Self {
        self.open = open;
        self
    }

    /// Whether the line has started on `date`.
    #[must_use]
    pub fn started_by(&self, date: NaiveDate) -> bool {
        self.starting_date.is_none_or(|start| start <= date)
    }
}
