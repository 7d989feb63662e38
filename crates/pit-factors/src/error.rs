//! Error types for factor registration, computation and caching.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type for factor operations.
pub type Result<T> = std::result::Result<T, FactorError>;

/// Errors that can occur while building the registry or serving a query.
#[derive(Debug, Error)]
pub enum FactorError {
    /// Two descriptors share one name
    #[error("Duplicate factor name: {0}")]
    DuplicateFactor(String),

    /// A descriptor declares a dependency that is not registered
    #[error("Factor {factor} depends on unknown factor {dependency}")]
    UnknownDependency {
        /// Declaring factor
        factor: String,
        /// Missing dependency name
        dependency: String,
    },

    /// Dependency declarations or compute routines form a cycle
    #[error("Cyclic dependency: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),

    /// A trading date in the requested range has no usable value
    #[error("Data missed for {factor}: no value on {date}")]
    Incomplete {
        /// Factor being validated
        factor: String,
        /// First trading date without a non-missing value
        date: NaiveDate,
    },

    /// Row index is not strictly increasing
    #[error("Mixed index order for {factor}: {previous} is followed by {next}")]
    IndexOrder {
        /// Factor being validated
        factor: String,
        /// Row date before the inversion
        previous: NaiveDate,
        /// Row date at the inversion
        next: NaiveDate,
    },

    /// Factor not found in registry
    #[error("Factor not found: {0}")]
    NotFound(String),

    /// Data source has no rows registered under this query id
    #[error("Unknown raw data query: {0}")]
    UnknownQuery(String),

    /// Invalid date range
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Start date of the range
        start: NaiveDate,
        /// End date of the range
        end: NaiveDate,
    },

    /// Request starts before the factor may be queried
    #[error("Factor {factor} is valid from {valid_from}, requested from {start}")]
    BeforeValidityStart {
        /// Requested factor
        factor: String,
        /// Earliest permitted start
        valid_from: NaiveDate,
        /// Requested start
        start: NaiveDate,
    },

    /// Two panels do not share row and column labels
    #[error("Panel shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Missing required column in input data
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// Raw data could not be interpreted
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Polars DataFrame error
    #[error("DataFrame error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Store or data file I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted panel could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl FactorError {
    /// Whether this error comes from an invalid registry rather than from data.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::DuplicateFactor(_) | Self::UnknownDependency { .. } | Self::CyclicDependency(_)
        )
    }
}
