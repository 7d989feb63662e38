//! Momentum factors - trailing price change.

pub mod price_momentum;

pub use price_momentum::{PriceMomentum, PriceMomentumConfig};

use crate::{
    catalog::derived_start,
    registry::{FactorCategory, FactorDescriptor},
    traits::ConfigurableFactor,
};

/// Descriptors of the momentum factors.
pub fn descriptors() -> Vec<FactorDescriptor> {
    [("MOM_1M", 20, "One month"), ("MOM_3M", 60, "Three month")]
        .into_iter()
        .map(|(name, window, horizon)| {
            let factor = PriceMomentum::with_config(PriceMomentumConfig {
                window,
                ..PriceMomentumConfig::default()
            });
            FactorDescriptor::new(name, factor)
                .describe(format!("{horizon} ({window} session) adjusted price change"))
                .depends_on(["ADJ_CLOSE"])
                .valid_from(derived_start())
                .in_category(FactorCategory::Momentum)
        })
        .collect()
}
