use crate::error::StoreError;
use crate::memory::{MemoryStore, MemoryStoreInner, Tables};
use fxhash::FxHashSet;
use nseries_domain::{Series, SeriesCatalog, SeriesLine, SeriesRelationship};
use std::sync::Arc;
use tracing::info;

/// Collects series, lines and relationships, then validates them as a whole.
#[derive(Debug, Default)]
pub struct MemoryStoreBuilder {
    catalog: SeriesCatalog,
}

impl MemoryStoreBuilder {
    #[must_use = "Creates a new, empty store builder"]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "Adds a series definition to the store"]
    pub fn series(mut self, series: Series) -> Self {
        self.catalog.series.push(series);
        self
    }

    #[must_use = "Adds a series line to the store"]
    pub fn line(mut self, line: SeriesLine) -> Self {
        self.catalog.lines.push(line);
        self
    }

    #[must_use = "Adds a series relationship to the store"]
    pub fn relationship(mut self, relationship: SeriesRelationship) -> Self {
        self.catalog.relationships.push(relationship);
        self
    }

    /// Merges a whole catalog, typically loaded from configuration.
    #[must_use = "Adds every entry of the catalog to the store"]
    pub fn catalog(mut self, catalog: SeriesCatalog) -> Self {
        self.catalog.series.extend(catalog.series);
        self.catalog.lines.extend(catalog.lines);
        self.catalog.relationships.extend(catalog.relationships);
        self
    }

    /// Validates the collected catalog and returns a ready [`MemoryStore`].
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidCatalog`] for empty or duplicate series codes, duplicate
    /// line keys, zero increments or empty starting numbers, and
    /// [`StoreError::SeriesNotFound`] when a line or relationship names an unknown series.
    pub fn build(self) -> Result<MemoryStore, StoreError> {
        let SeriesCatalog { series, lines, relationships } = self.catalog;
        let mut tables = Tables::default();

        for entry in series {
            if entry.code.trim().is_empty() {
                return Err(invalid("series code must not be empty"));
            }
            if tables.series.contains_key(&entry.code) {
                return Err(invalid(format!("duplicate series '{}'", entry.code)));
            }
            tables.series.insert(entry.code.clone(), entry);
        }

        for line in lines {
            validate_line(&line)?;
            if !tables.series.contains_key(&line.series) {
                return Err(crate::memory::series_not_found(&line.series));
            }
            let key = line.key();
            if tables.lines.contains_key(&key) {
                return Err(invalid(format!("duplicate line '{key}'")));
            }
            tables.lines.insert(key, line);
        }

        let mut seen = FxHashSet::default();
        for relationship in relationships {
            for code in [&relationship.primary, &relationship.related] {
                if !tables.series.contains_key(code) {
                    return Err(crate::memory::series_not_found(code));
                }
            }
            if seen.insert(relationship.clone()) {
                tables.relationships.push(relationship);
            }
        }

        info!(
            series = tables.series.len(),
            lines = tables.lines.len(),
            relationships = tables.relationships.len(),
            "Memory store initialized"
        );

        Ok(MemoryStore { inner: Arc::new(MemoryStoreInner::new(tables)) })
    }
}

pub(crate) fn validate_line(line: &SeriesLine) -> Result<(), StoreError> {
    if line.increment_by == 0 {
        return Err(invalid(format!("line '{}' must increment by at least 1", line.key())));
    }
    if line.starting_no.trim().is_empty() {
        return Err(invalid(format!("line '{}' has no starting number", line.key())));
    }
    Ok(())
}

fn invalid(message: impl Into<std::borrow::Cow<'static, str>>) -> StoreError {
    StoreError::InvalidCatalog { message: message.into(), context: None }
}
