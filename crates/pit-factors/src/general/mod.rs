//! General factors - industry, listing state, special treatment,
//! tradability and index membership.
//!
//! The status flags are known as of the date they are attached to, so they
//! are aligned with immediate effect. Industry reclassifications are seen
//! from the following session.

pub mod index;
pub mod industry;
pub mod list_status;
pub mod st_tag;
pub mod tradeable;

pub use index::{IndexConstituents, IndexConstituentsConfig, IndexWeights, IndexWeightsConfig};
pub use industry::{Industry, IndustryConfig};
pub use list_status::{ListStatus, ListStatusConfig};
pub use st_tag::{SpecialTreatment, SpecialTreatmentConfig};
pub use tradeable::{Tradeable, TradeableConfig};

use crate::{
    catalog::data_start,
    registry::{FactorCategory, FactorDescriptor},
    traits::ConfigurableFactor,
};

/// Index codes with a constituent flag factor.
const CONSTITUENT_INDICES: [(&str, &str, &str); 3] = [
    ("IH_CONS", "000016", "SSE 50"),
    ("IF_CONS", "000300", "CSI 300"),
    ("IC_CONS", "000905", "CSI 500"),
];

/// Index codes with a constituent weight factor.
const WEIGHTED_INDICES: [(&str, &str, &str); 5] = [
    ("IH_WEIGHTS", "000016", "SSE 50"),
    ("IF_WEIGHTS", "000300", "CSI 300"),
    ("IC_WEIGHTS", "000905", "CSI 500"),
    ("SSEC_WEIGHTS", "000001", "SSE Composite"),
    ("CSI1000_WEIGHTS", "000852", "CSI 1000"),
];

/// Descriptors of the general factors.
pub fn descriptors() -> Vec<FactorDescriptor> {
    let mut out = vec![
        FactorDescriptor::new("ZX_IND", Industry::default())
            .describe("CITIC industry classification (categorical)"),
        FactorDescriptor::new("LIST_STATUS", ListStatus::default()).describe(
            "Listing status: 1 listed, 2 suspended listing, 3 delisting arrangement, 4 delisted",
        ),
        FactorDescriptor::new("ST_TAG", SpecialTreatment::default()).describe(
            "Special treatment: 0 none, 1 ST, 2 *ST, 3 delisting arrangement, 4 risk warning, 5 PT",
        ),
        FactorDescriptor::new("TRADEABLE", Tradeable::default())
            .describe("1 when traded with a price range, 0 when suspended, missing when not listed"),
    ];
    for (name, index_code, label) in CONSTITUENT_INDICES {
        let factor = IndexConstituents::with_config(IndexConstituentsConfig {
            index_code: index_code.to_string(),
            ..IndexConstituentsConfig::default()
        });
        out.push(
            FactorDescriptor::new(name, factor)
                .describe(format!("{label} membership: 1 for constituents, missing otherwise")),
        );
    }
    for (name, index_code, label) in WEIGHTED_INDICES {
        let factor = IndexWeights::with_config(IndexWeightsConfig {
            index_code: index_code.to_string(),
            ..IndexWeightsConfig::default()
        });
        out.push(
            FactorDescriptor::new(name, factor)
                .describe(format!("{label} constituent weight as a fraction")),
        );
    }
    out.into_iter()
        .map(|d| d.valid_from(data_start()).in_category(FactorCategory::General))
        .collect()
}
