use crate::line::SeriesLine;
use crate::relationship::SeriesRelationship;
use crate::series::Series;
use serde::{Deserialize, Serialize};

/// Everything configuration knows about number series, as loaded from a config source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesCatalog {
    pub series: Vec<Series>,
    pub lines: Vec<SeriesLine>,
    pub relationships: Vec<SeriesRelationship>,
}

impl SeriesCatalog {
    #[must_use]
    pub fn with_series(mut self, series: Series) -> Self {
        self.series.push(series);
        self
    }

    #[must_use]
    pub fn with_line(mut self, line: SeriesLine) -> Self {
        self.lines.push(line);
        self
    }

    #[must_use]
    pub fn with_relationship(mut self, relationship: SeriesRelationship) -> Self {
        self.relationships.push(relationship);
        self
    }
}
