//! Facade crate for the number-series engine.
//! Re-exports domain, kernel, store and numbering crates and wires them from configuration.
//! Keep this crate thin: it should compose other crates, not implement business logic.
//!
//! ## Usage
//! - Load an [`EngineConfig`](domain::config::EngineConfig) with
//!   [`kernel::config::load_config`].
//! - Call [`init`] to get a ready [`NoSeries`] engine over an in-memory store.

pub use nseries_domain as domain;
pub use nseries_kernel as kernel;
pub use nseries_numbering as numbering;
pub use nseries_store as store;

pub use nseries_numbering::{Batch, ErrorKind, NoSeries, NumberingError};
pub use nseries_store::{LineRepository, MemoryStore, Transaction};

use nseries_domain::config::EngineConfig;
use nseries_kernel::calendar::{FixedCalendar, SystemCalendar, WorkDate};
use std::sync::Arc;
use tracing::info;

/// Builds an engine over the catalog in `config`.
///
/// The work date is pinned when `config.work_date` is set, else it follows the system date.
///
/// # Errors
/// Returns [`NumberingError::Store`] if the catalog fails validation.
pub fn init(config: &EngineConfig) -> Result<NoSeries<MemoryStore>, NumberingError> {
    let store = MemoryStore::builder().catalog(config.catalog.clone()).build()?;

    let calendar: Arc<dyn WorkDate> = match config.work_date {
        Some(date) => Arc::new(FixedCalendar::new(date)),
        None => Arc::new(SystemCalendar),
    };

    let engine = NoSeries::builder().repository(store).calendar(calendar).build();
    info!(
        series = config.catalog.series.len(),
        lines = config.catalog.lines.len(),
        work_date = %engine.work_date(),
        "Number series engine initialized"
    );
    Ok(engine)
}
