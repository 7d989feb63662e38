//! Volatility factors - market sensitivity and the shape of the return
//! distribution.
//!
//! Beta and specific volatility come out of one rolling regression of stock
//! returns on benchmark returns; skewness and kurtosis are windowed moments of
//! daily returns.

pub mod beta;
pub mod moments;

pub use beta::{MarketBeta, MarketRegressionConfig, SpecificVolatility};
pub use moments::{MomentStat, ReturnMoment, ReturnMomentConfig};

use crate::{
    catalog::derived_start,
    registry::{FactorCategory, FactorDescriptor},
    traits::ConfigurableFactor,
};

/// Descriptors of the volatility factors.
pub fn descriptors() -> Vec<FactorDescriptor> {
    let regression = MarketRegressionConfig::default();
    let regression_inputs = [regression.price.clone(), regression.benchmark.clone()];
    let moment = |stat| {
        ReturnMoment::with_config(ReturnMomentConfig {
            stat,
            ..ReturnMomentConfig::default()
        })
    };

    [
        FactorDescriptor::new("BETA", MarketBeta::with_config(regression.clone()))
            .describe("252 session rolling beta against the benchmark")
            .depends_on(regression_inputs.clone()),
        FactorDescriptor::new("SPECIAL_VOL", SpecificVolatility::with_config(regression))
            .describe("Residual volatility of the 252 session benchmark regression")
            .depends_on(regression_inputs),
        FactorDescriptor::new("SKEW_1M", moment(MomentStat::Skew))
            .describe("Skewness of daily returns over 20 sessions")
            .depends_on(["DAILY_RET"]),
        FactorDescriptor::new("KURTOSIS_1M", moment(MomentStat::Kurtosis))
            .describe("Excess kurtosis of daily returns over 20 sessions")
            .depends_on(["DAILY_RET"]),
    ]
    .into_iter()
    .map(|d| d.valid_from(derived_start()).in_category(FactorCategory::Volatility))
    .collect()
}
