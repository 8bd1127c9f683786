use crate::series::SeriesCode;
use serde::{Deserialize, Serialize};

/// Declares that `related` may stand in for `primary`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesRelationship {
    pub primary: SeriesCode,
    pub related: SeriesCode,
}

impl SeriesRelationship {
    pub fn new(primary: impl Into<SeriesCode>, related: impl Into<SeriesCode>) -> Self {
        Self { primary: primary.into(), related: related.into() }
    }
}
