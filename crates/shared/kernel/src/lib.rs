//! Kernel utilities shared across slices.
//! Keep this crate lightweight; it provides config loading and the working-date seam.
//!
//! ## Working date
//! ```rust
//! use chrono::NaiveDate;
//! use nseries_kernel::calendar::{FixedCalendar, WorkDate};
//!
//! let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
//! let calendar = FixedCalendar::new(date);
//! assert_eq!(calendar.work_date(), date);
//! ```
//!
//! ## Config loading (non-wasm)
//! ```rust,ignore
//! use nseries_kernel::config::load_config;
//! use nseries_kernel::domain::config::EngineConfig;
//!
//! let cfg: EngineConfig = load_config(Some("nseries.toml")).unwrap();
//! ```
pub mod calendar;
#[cfg(not(target_arch = "wasm32"))]
pub mod config;

pub use nseries_domain as domain;
