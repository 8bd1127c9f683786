//! # Domain Models
//!
//! Pure number-series data with minimal dependencies (`serde`, `bitflags`, `chrono`).
//! Keep it lean: no I/O, locking, or allocation logic, just data and simple helpers.

pub mod catalog;
pub mod config;
pub mod line;
pub mod relationship;
pub mod series;

pub use catalog::SeriesCatalog;
pub use line::{LineKey, SeriesLine};
pub use relationship::SeriesRelationship;
pub use series::{Series, SeriesCode, SeriesFlags, SeriesKind};
