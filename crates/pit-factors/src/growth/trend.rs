//! Multi-year trend growth.
//!
//! The yearly values are regressed on time, with the oldest year at 1 and
//! the latest at `years`, and the slope is scaled by the magnitude of their
//! mean so firms of different size compare.

use crate::{
    FactorError, Result,
    catalog::safe_div,
    engine::QueryEngine,
    panel::Panel,
    registry::FactorDescriptor,
    traits::{Compute, ConfigurableFactor},
    universe::Universe,
};
use chrono::NaiveDate;
use ndarray::Array2;

/// Configuration for the TrendGrowth factor.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TrendGrowthConfig {
    /// Item prefix; yearly inputs are `<item>_1Y` (latest) to `<item>_<years>Y`
    pub item: String,
    /// Number of fiscal years in the fit
    pub years: u32,
}

impl Default for TrendGrowthConfig {
    fn default() -> Self {
        Self {
            item: "NI".to_string(),
            years: 5,
        }
    }
}

/// Trend slope over fiscal years divided by the absolute mean.
#[derive(Debug, Clone, Default)]
pub struct TrendGrowth {
    config: TrendGrowthConfig,
}

impl TrendGrowth {
    /// Names of the yearly inputs, latest first.
    fn inputs(item: &str, years: u32) -> Vec<String> {
        (1..=years).map(|n| format!("{item}_{n}Y")).collect()
    }

    /// Descriptor declaring every yearly input as a dependency.
    pub fn descriptor(name: &str, item: &str, years: u32) -> FactorDescriptor {
        let factor = Self::with_config(TrendGrowthConfig {
            item: item.to_string(),
            years,
        });
        FactorDescriptor::new(name, factor).depends_on(Self::inputs(item, years))
    }
}

impl ConfigurableFactor for TrendGrowth {
    type Config = TrendGrowthConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

/// Slope of `latest_first` on time over its mean magnitude.
///
/// Missing when any year is missing or the mean is zero.
pub fn trend_growth(latest_first: &[f64]) -> f64 {
    let n = latest_first.len();
    if n < 2 || latest_first.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    let mean = latest_first.iter().sum::<f64>() / n as f64;
    let t_mean = (n as f64 + 1.0) / 2.0;
    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (i, v) in latest_first.iter().enumerate() {
        // latest year sits at t = n
        let t = (n - i) as f64 - t_mean;
        sxy += t * (v - mean);
        sxx += t * t;
    }
    safe_div(sxy / sxx, mean.abs())
}

impl Compute for TrendGrowth {
    fn compute(
        &self,
        engine: &mut QueryEngine,
        _universe: &Universe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Panel> {
        let mut yearly = Vec::new();
        for input in Self::inputs(&self.config.item, self.config.years) {
            yearly.push(engine.query(&input, start, end, None)?);
        }
        let Some(latest) = yearly.first() else {
            return Err(FactorError::InvalidData(format!(
                "trend growth of {} over zero years",
                self.config.item
            )));
        };
        if yearly
            .iter()
            .any(|p| p.index() != latest.index() || p.columns() != latest.columns())
        {
            return Err(FactorError::ShapeMismatch(format!(
                "yearly inputs of {} disagree on labels",
                self.config.item
            )));
        }

        let values = Array2::from_shape_fn((latest.nrows(), latest.ncols()), |(i, j)| {
            let series: Vec<f64> = yearly.iter().map(|p| p.values()[[i, j]]).collect();
            trend_growth(&series)
        });
        Panel::new(latest.index().to_vec(), latest.columns().to_vec(), values)
    }
}
