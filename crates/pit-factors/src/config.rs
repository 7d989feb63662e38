//! Engine configuration.

use crate::{
    Result,
    calendar::WeekdayCalendar,
    engine::QueryEngine,
    registry::FactorRegistry,
    source::CsvSource,
    store::CachedFactorStore,
    universe::Universe,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Settings for an engine backed by CSV extracts and a weekday calendar.
///
/// ```toml
/// store_dir = "cache"
/// data_dir = "raw"
/// universe = ["000001", "600000"]
/// holidays = ["2010-01-01"]
/// log_filter = "pit_factors=debug"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory of the persisted store; absent keeps the cache in memory
    pub store_dir: Option<PathBuf>,
    /// Directory holding `<query_id>.csv` raw extracts
    pub data_dir: PathBuf,
    /// Entity codes queries are restricted to
    pub universe: Universe,
    /// Weekdays that are not trading sessions
    pub holidays: Vec<NaiveDate>,
    /// Default tracing filter, overridden by `RUST_LOG`
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store_dir: None,
            data_dir: PathBuf::from("data"),
            universe: Universe::new(Vec::<String>::new()),
            holidays: Vec::new(),
            log_filter: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Open the configured store.
    pub fn open_store(&self) -> Result<CachedFactorStore> {
        match &self.store_dir {
            Some(dir) => CachedFactorStore::open(dir),
            None => Ok(CachedFactorStore::in_memory()),
        }
    }

    /// Build an engine over `registry` with the configured adapters.
    pub fn build_engine(&self, registry: Arc<FactorRegistry>) -> Result<QueryEngine> {
        Ok(QueryEngine::new(
            registry,
            self.open_store()?,
            Arc::new(WeekdayCalendar::with_holidays(self.holidays.iter().copied())),
            Arc::new(CsvSource::new(&self.data_dir)),
            self.universe.clone(),
        ))
    }
}
