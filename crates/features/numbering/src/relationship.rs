//! Related series: configured stand-ins a caller may pick instead of the primary series.

use crate::engine::NoSeries;
use crate::error::NumberingError;
use nseries_domain::{Series, SeriesCode};
use nseries_store::LineRepository;
use tracing::debug;

/// The external selection surface offered the candidates of [`NoSeries::select_related`].
pub trait SeriesPicker {
    /// Picks one of `candidates` (the original first, then its related series), or
    /// nothing.
    fn pick(&self, original: &SeriesCode, candidates: &[Series]) -> Option<SeriesCode>;
}

impl<F> SeriesPicker for F
where
    F: Fn(&SeriesCode, &[Series]) -> Option<SeriesCode>,
{
    fn pick(&self, original: &SeriesCode, candidates: &[Series]) -> Option<SeriesCode> {
        self(original, candidates)
    }
}

impl<R: LineRepository> NoSeries<R> {
    /// Whether `candidate` may stand in for `primary`. Every series is related to itself.
    ///
    /// # Errors
    /// - [`NumberingError::AutomaticNotAllowed`] if `primary` cannot assign numbers
    ///   automatically.
    /// - [`NumberingError::SeriesNotFound`] for an unknown `primary`.
    pub fn are_related(&self, primary: &str, candidate: &str) -> Result<bool, NumberingError> {
        let series = self.series(primary)?;
        if !series.default_allowed() {
            return Err(NumberingError::AutomaticNotAllowed {
                series: series.code,
                context: Some("relationship lookup".into()),
            });
        }
        if primary == candidate {
            return Ok(true);
        }
        Ok(self.related_codes(primary)?.iter().any(|code| code == candidate))
    }

    /// `original` followed by every series configured as related to it.
    ///
    /// # Errors
    /// Returns [`NumberingError::SeriesNotFound`] for unknown codes.
    pub fn related_series(&self, original: &str) -> Result<Vec<Series>, NumberingError> {
        let mut candidates = vec![self.series(original)?];
        for code in self.related_codes(original)? {
            if code != original {
                candidates.push(self.series(&code)?);
            }
        }
        Ok(candidates)
    }

    /// Whether any series is configured as related to `code`.
    ///
    /// # Errors
    /// Returns [`NumberingError::SeriesNotFound`] for unknown codes.
    pub fn has_related_series(&self, code: &str) -> Result<bool, NumberingError> {
        Ok(!self.related_codes(code)?.is_empty())
    }

    /// Offers `original` and its related series to `picker`. Returns the chosen code, or
    /// `None` when nothing (or something outside the candidates) was picked.
    ///
    /// # Errors
    /// Returns [`NumberingError::SeriesNotFound`] for unknown codes.
    pub fn select_related(
        &self,
        original: &str,
        picker: &impl SeriesPicker,
    ) -> Result<Option<SeriesCode>, NumberingError> {
        let candidates = self.related_series(original)?;
        let original = SeriesCode::from(original);

        let chosen = picker
            .pick(&original, &candidates)
            .filter(|code| candidates.iter().any(|series| series.code == *code));
        debug!(
            series = %original,
            candidates = candidates.len(),
            chosen = chosen.as_deref().unwrap_or_default(),
            "Related series selection"
        );
        Ok(chosen)
    }

    fn related_codes(&self, code: &str) -> Result<Vec<SeriesCode>, NumberingError> {
        self.repository().related(code).map_err(|e| NumberingError::from_lookup(code, e))
    }
}
