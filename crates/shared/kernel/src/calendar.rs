//! Working-date providers.
//!
//! Allocation calls that leave the usage date blank fall back to the caller's working
//! date. The provider is injected so tests and batch jobs can pin it.

use chrono::{Local, NaiveDate};
use parking_lot::RwLock;
use std::fmt::Debug;

/// Source of the caller's current working date.
pub trait WorkDate: Debug + Send + Sync {
    fn work_date(&self) -> NaiveDate;
}

/// Uses the local system date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCalendar;

impl WorkDate for SystemCalendar {
    fn work_date(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A working date pinned by configuration or by the caller; can be moved explicitly.
#[derive(Debug)]
pub struct FixedCalendar {
    date: RwLock<NaiveDate>,
}

impl FixedCalendar {
    #[must_use]
    pub const fn new(date: NaiveDate) -> Self {
        Self { date: RwLock::new(date) }
    }

    /// Moves the working date.
    pub fn set(&self, date: NaiveDate) {
        *self.date.write() = date;
    }
}

impl WorkDate for FixedCalendar {
    fn work_date(&self) -> NaiveDate {
        *self.date.read()
    }
}
