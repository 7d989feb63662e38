//! Core trait definitions for factors.
//!
//! Every factor's compute routine implements [`Compute`]: given the engine it
//! runs under, the universe and an inclusive date range, it produces a panel.
//! Routines pull their dependencies through [`QueryEngine::query`], so a
//! derived factor never touches raw data of the factors it builds on.

use crate::{Result, engine::QueryEngine, panel::Panel, universe::Universe};
use chrono::NaiveDate;

/// A routine producing one factor over a date range.
///
/// The returned panel must cover every trading date in `[start, end]` with
/// strictly increasing rows; it may carry extra rows or codes, which the
/// engine trims before caching.
pub trait Compute: Send + Sync {
    /// Compute the factor for `universe` over `[start, end]`.
    fn compute(
        &self,
        engine: &mut QueryEngine,
        universe: &Universe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Panel>;
}

/// Plain closures are compute routines.
impl<F> Compute for F
where
    F: Fn(&mut QueryEngine, &Universe, NaiveDate, NaiveDate) -> Result<Panel> + Send + Sync,
{
    fn compute(
        &self,
        engine: &mut QueryEngine,
        universe: &Universe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Panel> {
        self(engine, universe, start, end)
    }
}

/// Marker trait for factor configuration types.
///
/// All config types should implement Default, Clone, Send, Sync, and Debug.
pub trait FactorConfig: Default + Clone + Send + Sync + std::fmt::Debug {}

/// Blanket implementation for any type that satisfies the trait bounds.
impl<T: Default + Clone + Send + Sync + std::fmt::Debug> FactorConfig for T {}

/// A compute routine built from a configuration, like a factory capturing
/// its parameters.
pub trait ConfigurableFactor: Compute + Sized {
    /// Configuration type for this factor.
    type Config: FactorConfig;

    /// Create a new factor with the given configuration.
    fn with_config(config: Self::Config) -> Self;

    /// Returns the current configuration.
    fn config(&self) -> &Self::Config;
}
