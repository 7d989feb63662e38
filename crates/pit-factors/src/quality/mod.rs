//! Quality factors - profitability relative to the capital employed.

use crate::{
    catalog::derived_start,
    registry::{FactorCategory, FactorDescriptor},
    value::Ratio,
};

/// Descriptors of the quality factors.
pub fn descriptors() -> Vec<FactorDescriptor> {
    [
        Ratio::descriptor("ROE", "NI_TTM", "EQUITY")
            .describe("Return on equity, trailing twelve months"),
        Ratio::descriptor("ROA", "NI_TTM", "TA").describe("Return on assets, trailing twelve months"),
    ]
    .into_iter()
    .map(|d| d.valid_from(derived_start()).in_category(FactorCategory::Quality))
    .collect()
}
