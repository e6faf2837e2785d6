//! Tier1: labor-hours calculation.
//!
//! Every percentage effect is taken against the *original* base hours and
//! added to the running total. Effects are therefore additive and
//! order-independent; chaining percentages against the running total would
//! change results and is deliberately not done.

use crate::config::{ServiceConfig, VariableRole};
use crate::error::PricingError;
use crate::models::{LaborEstimate, PricingSelections};

const HOURS_PER_LABOR_DAY: f64 = 8.0;

/// Compute total labor hours for `quantity` units of work.
///
/// `bundled_hours` carries any already-computed bundled-service hours (e.g.
/// excavation); they are additive, not base-relative, and are resolved by
/// the orchestrator so this stage stays pure and synchronous.
pub fn calculate_labor(
    config: &ServiceConfig,
    selections: &PricingSelections,
    quantity: f64,
    bundled_hours: f64,
) -> Result<LaborEstimate, PricingError> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(PricingError::InvalidQuantity(quantity));
    }

    let crew = config.optimal_team_size as f64;
    let base_hours = (quantity / config.base_productivity) * crew * HOURS_PER_LABOR_DAY;

    let mut steps = Vec::new();
    steps.push(format!(
        "Base: ({quantity} / {productivity}) x {crew} crew x {day}h = {base_hours:.2}h",
        productivity = config.base_productivity,
        day = HOURS_PER_LABOR_DAY,
    ));

    let mut total_hours = base_hours;

    if bundled_hours > 0.0 {
        total_hours += bundled_hours;
        steps.push(format!("Bundled service: +{bundled_hours:.2}h (additive)"));
    }

    // Variable effects. BTreeMap iteration keeps accumulation order (and so
    // the floating-point result) deterministic.
    let mut adjusted_hours = base_hours;
    for (name, variable) in &config.variables {
        let selected = selections.options.get(name).map(String::as_str);
        let Some(option) = variable.resolve(selected) else {
            continue;
        };

        let delta = match variable.role {
            VariableRole::LaborPercent => {
                if option.value != 0.0 {
                    let delta = base_hours * (option.value / 100.0);
                    steps.push(format!(
                        "{name}: {base_hours:.2}h x {pct}% = {delta:+.2}h",
                        pct = option.value,
                    ));
                    delta
                } else {
                    0.0
                }
            }
            VariableRole::Cutting => {
                if option.fixed_labor_hours > 0.0 {
                    steps.push(format!(
                        "{name}: fixed {hours:.2}h",
                        hours = option.fixed_labor_hours,
                    ));
                    option.fixed_labor_hours
                } else if option.labor_percentage != 0.0 {
                    let delta = base_hours * (option.labor_percentage / 100.0);
                    steps.push(format!(
                        "{name}: {base_hours:.2}h x {pct}% = {delta:+.2}h",
                        pct = option.labor_percentage,
                    ));
                    delta
                } else {
                    0.0
                }
            }
            // Cost-side roles contribute no hours
            VariableRole::MaterialStyle
            | VariableRole::Complexity
            | VariableRole::EquipmentDaily
            | VariableRole::FlatFee => 0.0,
        };

        adjusted_hours += delta;
        total_hours += delta;
    }

    let total_days = total_hours / (crew * HOURS_PER_LABOR_DAY);
    steps.push(format!(
        "Total: {total_hours:.2}h / ({crew} crew x {day}h) = {total_days:.2} days",
        day = HOURS_PER_LABOR_DAY,
    ));

    Ok(LaborEstimate {
        base_hours,
        bundled_hours,
        adjusted_hours,
        total_hours,
        total_days,
        breakdown_steps: steps,
    })
}
