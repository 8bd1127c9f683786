//! Manual-entry and automatic-assignment checks.

use crate::engine::NoSeries;
use crate::error::NumberingError;
use nseries_store::LineRepository;

/// Field name reported when a caller types a number by hand.
pub const NUMBER_FIELD: &str = "No.";

impl<R: LineRepository> NoSeries<R> {
    /// Checks that callers may type a number for `code` by hand. An empty code has no
    /// series attached, so anything goes.
    ///
    /// # Errors
    /// - [`NumberingError::ManualNotAllowed`] if the series forbids manual numbers.
    /// - [`NumberingError::SeriesNotFound`] for unknown codes.
    pub fn allow_manual_entry(&self, code: &str) -> Result<(), NumberingError> {
        self.check_manual(code, None)
    }

    /// Same as [`NoSeries::allow_manual_entry`]; `document_no` is only carried in the
    /// error for attribution.
    ///
    /// # Errors
    /// See [`NoSeries::allow_manual_entry`].
    pub fn allow_manual_entry_for(&self, code: &str, document_no: &str) -> Result<(), NumberingError> {
        self.check_manual(code, Some(document_no))
    }

    /// Checks that `code` may assign numbers automatically.
    ///
    /// # Errors
    /// - [`NumberingError::AutomaticNotAllowed`] if the series is manual-only.
    /// - [`NumberingError::SeriesNotFound`] for unknown codes.
    pub fn test_automatic(&self, code: &str) -> Result<(), NumberingError> {
        if self.is_automatic(code)? {
            Ok(())
        } else {
            Err(NumberingError::AutomaticNotAllowed { series: code.into(), context: None })
        }
    }

    /// # Errors
    /// Returns [`NumberingError::SeriesNotFound`] for unknown codes.
    pub fn is_automatic(&self, code: &str) -> Result<bool, NumberingError> {
        Ok(self.series(code)?.default_allowed())
    }

    /// # Errors
    /// Returns [`NumberingError::SeriesNotFound`] for unknown codes.
    pub fn is_manual(&self, code: &str) -> Result<bool, NumberingError> {
        Ok(self.series(code)?.manual_allowed())
    }

    fn check_manual(&self, code: &str, document_no: Option<&str>) -> Result<(), NumberingError> {
        if code.is_empty() || self.is_manual(code)? {
            return Ok(());
        }
        Err(NumberingError::ManualNotAllowed {
            series: code.into(),
            field: NUMBER_FIELD.into(),
            document: document_no.map(str::to_owned),
            context: None,
        })
    }
}
