//! Tier2: monetary breakdown, consuming Tier1's hours.
//!
//! The computation order is load-bearing: material waste before bundling,
//! complexity before profit, pass-through costs after profit. Currency is
//! rounded to cents only when the final `CostEstimate` is constructed;
//! intermediate sums keep full precision.

use crate::config::{ServiceConfig, VariableRole};
use crate::error::PricingError;
use crate::excavation::ExcavationCost;
use crate::models::{round_currency, CostEstimate, LaborEstimate, PricingSelections};

/// Compute the cost breakdown from a Tier1 labor estimate.
///
/// `bundled` is the pre-computed bundled-service cost, if any; it accrues
/// profit markup, unlike pass-through items.
pub fn calculate_costs(
    config: &ServiceConfig,
    selections: &PricingSelections,
    labor: &LaborEstimate,
    quantity: f64,
    bundled: Option<ExcavationCost>,
) -> Result<CostEstimate, PricingError> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(PricingError::InvalidQuantity(quantity));
    }

    // 1. Labor
    let labor_cost = labor.total_hours * config.hourly_labor_rate;

    // 2. Materials: base cost scaled by the selected style multiplier
    let material_multiplier = resolve(config, selections, VariableRole::MaterialStyle)
        .map(|opt| opt.multiplier)
        .unwrap_or(1.0);
    let material_cost_base = config.base_material_cost * quantity * material_multiplier;

    // 3. Waste from the cutting/pattern-complexity selection
    let waste_pct = resolve(config, selections, VariableRole::Cutting)
        .map(|opt| opt.material_waste)
        .unwrap_or(0.0);
    let material_waste_cost = material_cost_base * (waste_pct / 100.0);
    let total_material_cost = material_cost_base + material_waste_cost;

    // 4. Bundled service cost (profit-bearing)
    let bundled_cost = bundled.as_ref().map(|b| b.total).unwrap_or(0.0);

    // 5. Pass-through costs: never marked up
    let equipment_daily = resolve(config, selections, VariableRole::EquipmentDaily)
        .map(|opt| opt.value)
        .unwrap_or(0.0);
    // Rentals bill whole days
    let equipment_cost = equipment_daily * labor.total_days.ceil();
    let flat_fees = resolve(config, selections, VariableRole::FlatFee)
        .map(|opt| opt.value)
        .unwrap_or(0.0);
    let pass_through_costs = equipment_cost + flat_fees;

    // 6. Overall complexity, applied to the profit-bearing base before profit
    let complexity_pct = resolve(config, selections, VariableRole::Complexity)
        .map(|opt| opt.value)
        .unwrap_or(0.0);
    let complexity_factor = 1.0 + complexity_pct / 100.0;
    let marked_up_base = (labor_cost + total_material_cost + bundled_cost) * complexity_factor;

    // 7. Profit on the complexity-adjusted base only
    let profit = marked_up_base * config.profit_margin;

    // 8. Total; subtotal is reported inclusive of profit and pass-through
    let total = marked_up_base + profit + pass_through_costs;

    // 9. Per-unit price
    let unit_price = total / quantity;

    Ok(CostEstimate {
        labor_cost: round_currency(labor_cost),
        material_cost_base: round_currency(material_cost_base),
        material_waste_cost: round_currency(material_waste_cost),
        total_material_cost: round_currency(total_material_cost),
        bundled_cost: round_currency(bundled_cost),
        bundled_details: bundled,
        pass_through_costs: round_currency(pass_through_costs),
        subtotal: round_currency(total),
        profit: round_currency(profit),
        total: round_currency(total),
        unit_price: round_currency(unit_price),
    })
}

/// First configured variable with the given role, resolved through the
/// user's selection (or the variable default).
fn resolve<'a>(
    config: &'a ServiceConfig,
    selections: &PricingSelections,
    role: VariableRole,
) -> Option<&'a crate::config::VariableOption> {
    config
        .variables
        .iter()
        .find(|(_, variable)| variable.role == role)
        .and_then(|(name, variable)| {
            variable.resolve(selections.options.get(name).map(String::as_str))
        })
}
