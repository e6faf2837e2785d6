use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::config::ConfigSource;
use crate::excavation::ExcavationCost;

/// The user's chosen option key per variable, plus bundling flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingSelections {
    /// Variable name -> selected option key. Missing variables fall back to
    /// their configured defaults; unknown keys do too.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    #[serde(default)]
    pub integrations: ServiceIntegrations,
    /// Independent quantity for the bundled service; defaults to the primary
    /// service's quantity
    #[serde(default)]
    pub integration_quantity: Option<f64>,
}

impl PricingSelections {
    pub fn select(mut self, variable: &str, option: &str) -> Self {
        self.options.insert(variable.to_string(), option.to_string());
        self
    }

    pub fn with_excavation(mut self) -> Self {
        self.integrations.include_excavation = true;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceIntegrations {
    #[serde(default)]
    pub include_excavation: bool,
}

/// Tier1 output: labor hours with an ordered audit trail.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaborEstimate {
    pub base_hours: f64,
    pub bundled_hours: f64,
    pub adjusted_hours: f64,
    pub total_hours: f64,
    pub total_days: f64,
    /// Human-readable formula steps, in application order
    pub breakdown_steps: Vec<String>,
}

/// Tier2 output: the monetary breakdown. Every currency field is rounded to
/// cents exactly once, at construction.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimate {
    pub labor_cost: f64,
    pub material_cost_base: f64,
    pub material_waste_cost: f64,
    pub total_material_cost: f64,
    pub bundled_cost: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundled_details: Option<ExcavationCost>,
    pub pass_through_costs: f64,
    pub subtotal: f64,
    pub profit: f64,
    pub total: f64,
    pub unit_price: f64,
}

/// The output contract of one pricing run. Created fresh per call, never
/// mutated, safe to serialize and cache.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResult {
    pub id: Uuid,
    pub company_id: String,
    pub service_name: String,
    pub quantity: f64,
    pub labor: LaborEstimate,
    pub costs: CostEstimate,
    /// Provenance of the configuration used; callers may surface
    /// `Fallback` as reduced confidence
    pub config_source: ConfigSource,
    pub generated_at: DateTime<Utc>,
}

/// Round to the currency precision (cents). Applied only at result
/// boundaries; intermediate sums keep full precision.
pub fn round_currency(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
