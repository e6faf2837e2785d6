use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::ConfigCache;
use crate::config::ServiceConfig;
use crate::error::PricingError;
use crate::excavation::{self, ExcavationCost};
use crate::models::{CalculationResult, PricingSelections};
use crate::store::ConfigStore;
use crate::{tier1, tier2};

/// Service name under which a company's excavation parameters are stored.
const EXCAVATION_SERVICE: &str = "excavation";

/// The pricing pipeline: configuration resolution, Tier1 labor hours, Tier2
/// costs, optional excavation bundling.
///
/// An explicit instance with an injected store; construct one per process
/// (or per test with a fake store) and share it behind an `Arc`.
pub struct PricingEngine {
    cache: Arc<ConfigCache>,
}

impl PricingEngine {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            cache: Arc::new(ConfigCache::new(store)),
        }
    }

    /// The shared cache, for wiring a [`crate::sync::RealtimeSync`] to the
    /// same entries this engine reads.
    pub fn cache(&self) -> Arc<ConfigCache> {
        self.cache.clone()
    }

    /// Cache-or-load; never fails for a missing record.
    pub async fn load_config(&self, service_name: &str, company_id: &str) -> Arc<ServiceConfig> {
        self.cache.get(company_id, service_name).await
    }

    /// Bypass the cache and refresh it.
    pub async fn force_reload_config(
        &self,
        service_name: &str,
        company_id: &str,
    ) -> Arc<ServiceConfig> {
        self.cache.force_reload(company_id, service_name).await
    }

    /// Primary pipeline entry point.
    ///
    /// Errors only on caller contract violations (`quantity <= 0`).
    /// Configuration problems degrade to fallback defaults and a failed
    /// bundled sub-calculation degrades to a zero contribution; in both
    /// cases a complete result is still returned.
    pub async fn calculate_pricing(
        &self,
        selections: &PricingSelections,
        quantity: f64,
        service_name: &str,
        company_id: &str,
    ) -> Result<CalculationResult, PricingError> {
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(PricingError::InvalidQuantity(quantity));
        }

        let started = Instant::now();
        let config = self.cache.get(company_id, service_name).await;

        // Bundled excavation: resolved before the pure tiers so they stay
        // synchronous. Its failure must not abort the primary quote.
        let (bundled_hours, bundled_cost) = if selections.integrations.include_excavation {
            let bundled_quantity = selections.integration_quantity.unwrap_or(quantity);
            self.bundled_excavation(company_id, bundled_quantity).await
        } else {
            (0.0, None)
        };

        let labor = tier1::calculate_labor(&config, selections, quantity, bundled_hours)?;
        let costs = tier2::calculate_costs(&config, selections, &labor, quantity, bundled_cost)?;

        let result = CalculationResult {
            id: Uuid::new_v4(),
            company_id: company_id.to_string(),
            service_name: service_name.to_string(),
            quantity,
            labor,
            costs,
            config_source: config.source,
            generated_at: Utc::now(),
        };

        crate::metrics::record_calculation(service_name, result.config_source, started.elapsed());
        debug!(
            company_id,
            service_name,
            quantity,
            total = result.costs.total,
            "Calculated pricing"
        );

        Ok(result)
    }

    /// Standalone excavation hours (no configuration needed).
    pub fn calculate_excavation_hours(quantity: f64) -> Result<u32, PricingError> {
        excavation::excavation_hours(quantity)
    }

    /// Standalone excavation cost, using the company's stored excavation
    /// parameters (or fallback defaults).
    pub async fn calculate_excavation_cost(
        &self,
        quantity: f64,
        company_id: &str,
        custom_depth: Option<f64>,
    ) -> Result<ExcavationCost, PricingError> {
        let config = self.cache.get(company_id, EXCAVATION_SERVICE).await;
        excavation::excavation_cost(&config.excavation, quantity, custom_depth)
    }

    /// Compute the bundled excavation contribution, degrading to zero on any
    /// failure.
    async fn bundled_excavation(
        &self,
        company_id: &str,
        quantity: f64,
    ) -> (f64, Option<ExcavationCost>) {
        let hours = match excavation::excavation_hours(quantity) {
            Ok(hours) => f64::from(hours),
            Err(e) => {
                warn!(
                    company_id,
                    error = %e,
                    "Bundled excavation hours failed, continuing without them"
                );
                crate::metrics::record_bundled_failure("hours");
                0.0
            }
        };

        let config = self.cache.get(company_id, EXCAVATION_SERVICE).await;
        let cost = match excavation::excavation_cost(&config.excavation, quantity, None) {
            Ok(cost) => Some(cost),
            Err(e) => {
                warn!(
                    company_id,
                    error = %e,
                    "Bundled excavation cost failed, pricing without it"
                );
                crate::metrics::record_bundled_failure("cost");
                None
            }
        };

        (hours, cost)
    }
}
