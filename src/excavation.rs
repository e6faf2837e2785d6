//! Excavation sub-formula: tiered labor hours and volumetric cost.
//!
//! Usable standalone (the `quoter excavation` command, the engine's
//! excavation entry points) or bundled into another service's calculation
//! when `includeExcavation` is selected.

use serde::Serialize;

use crate::config::{ExcavationParams, VolumeRounding};
use crate::error::PricingError;
use crate::models::round_currency;

/// Square feet covered by one 12-hour excavation tier.
const TIER_SIZE_SQFT: f64 = 1000.0;
const HOURS_PER_TIER: u32 = 12;

/// Labor hours for excavating `quantity` square feet.
///
/// Step function, not linear: each started block of 1000 sqft costs a full
/// 12-hour tier. 1000 sqft is still one tier; 1001 sqft is two.
pub fn excavation_hours(quantity: f64) -> Result<u32, PricingError> {
    check_quantity(quantity)?;
    let tiers = (quantity / TIER_SIZE_SQFT).ceil() as u32;
    Ok(tiers * HOURS_PER_TIER)
}

/// Volumetric excavation cost breakdown.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcavationCost {
    /// Base hauling cost before profit
    pub cost: f64,
    /// Billed volume in cubic yards (after waste/compaction and rounding)
    pub volume: f64,
    /// Rate per cubic yard
    pub rate: f64,
    pub profit: f64,
    pub total: f64,
    /// Depth actually used, in inches
    pub depth: f64,
    pub waste_factor: f64,
}

/// Volumetric excavation cost for `quantity` square feet.
///
/// `custom_depth` (inches, material-dependent) takes precedence over the
/// configured default depth.
pub fn excavation_cost(
    params: &ExcavationParams,
    quantity: f64,
    custom_depth: Option<f64>,
) -> Result<ExcavationCost, PricingError> {
    check_quantity(quantity)?;

    let depth = custom_depth
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(params.default_depth_inches);

    // sqft x inches -> cubic feet -> cubic yards
    let raw_volume = quantity * (depth / 12.0) / 27.0;
    let adjusted = raw_volume
        * (1.0 + params.waste_factor_pct / 100.0)
        * (1.0 + params.compaction_factor_pct / 100.0);
    let billed = round_volume(adjusted, params.rounding);

    let cost = billed * params.base_rate_per_cubic_yard;
    let profit = cost * params.profit_margin;

    Ok(ExcavationCost {
        cost: round_currency(cost),
        volume: billed,
        rate: params.base_rate_per_cubic_yard,
        profit: round_currency(profit),
        total: round_currency(cost + profit),
        depth,
        waste_factor: params.waste_factor_pct,
    })
}

fn round_volume(volume: f64, rule: VolumeRounding) -> f64 {
    match rule {
        VolumeRounding::Whole => volume.ceil(),
        VolumeRounding::Half => (volume * 2.0).ceil() / 2.0,
        VolumeRounding::None => volume,
    }
}

fn check_quantity(quantity: f64) -> Result<(), PricingError> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(PricingError::InvalidQuantity(quantity));
    }
    Ok(())
}
