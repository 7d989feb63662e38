#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/pit-factors/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod align;
pub mod calendar;
pub mod catalog;
pub mod categorical;
pub mod config;
pub mod engine;
pub mod error;
pub mod fundamental;
pub mod general;
pub mod growth;
pub mod momentum;
pub mod panel;
pub mod quality;
pub mod quote;
pub mod registry;
pub mod rolling;
pub mod source;
pub mod store;
pub mod traits;
pub mod universe;
pub mod validate;
pub mod value;
pub mod volatility;

// Re-export core types
pub use align::{TieBreak, align_frame, map_events};
pub use calendar::{FixedCalendar, TradingCalendar, WeekdayCalendar};
pub use categorical::Categories;
pub use config::EngineConfig;
pub use engine::QueryEngine;
pub use error::{FactorError, Result};
pub use panel::{FillNa, Panel};
pub use registry::{FactorCategory, FactorDescriptor, FactorInfo, FactorRegistry};
pub use rolling::{OlsStep, RollingMoments, rolling_ols, rolling_slope};
pub use source::{CsvSource, DataSource, FetchParams, InMemorySource};
pub use store::{CachedFactorStore, DateRange};
pub use traits::{Compute, ConfigurableFactor, FactorConfig};
pub use universe::Universe;
pub use validate::{check_completeness, check_index_order};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
