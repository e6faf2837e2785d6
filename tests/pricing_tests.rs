//! End-to-end tests for the pricing pipeline: configuration resolution,
//! Tier1 labor hours, Tier2 costs, excavation bundling, and realtime sync.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use quote_engine::config::{ConfigSource, RawOption, RawServiceRecord, RawVariable};
use quote_engine::engine::PricingEngine;
use quote_engine::models::{round_currency, PricingSelections};
use quote_engine::store::MemoryStore;
use quote_engine::sync::RealtimeSync;

fn percent_variable(default: &str, options: &[(&str, f64)]) -> RawVariable {
    RawVariable {
        default: Some(default.to_string()),
        options: options
            .iter()
            .map(|(key, value)| {
                (
                    key.to_string(),
                    RawOption {
                        value: Some(*value),
                        ..Default::default()
                    },
                )
            })
            .collect(),
        ..Default::default()
    }
}

/// A paver-patio record matching the documented example numbers:
/// 50 sqft/day productivity, 3-person crew, $25/h.
fn paver_patio_record() -> RawServiceRecord {
    let mut variables = BTreeMap::new();
    variables.insert(
        "accessDifficulty".to_string(),
        percent_variable("easy", &[("easy", 0.0), ("moderate", 15.0), ("difficult", 30.0)]),
    );

    let mut cutting_options = BTreeMap::new();
    cutting_options.insert(
        "minimal".to_string(),
        RawOption {
            material_waste: Some(5.0),
            ..Default::default()
        },
    );
    cutting_options.insert(
        "extensive".to_string(),
        RawOption {
            fixed_labor_hours: Some(6.0),
            material_waste: Some(15.0),
            ..Default::default()
        },
    );
    variables.insert(
        "cuttingComplexity".to_string(),
        RawVariable {
            default: Some("minimal".to_string()),
            options: cutting_options,
            ..Default::default()
        },
    );

    let mut style_options = BTreeMap::new();
    for (key, multiplier) in [("standard", 1.0), ("premium", 1.4)] {
        style_options.insert(
            key.to_string(),
            RawOption {
                multiplier: Some(multiplier),
                ..Default::default()
            },
        );
    }
    variables.insert(
        "materialStyle".to_string(),
        RawVariable {
            default: Some("standard".to_string()),
            options: style_options,
            ..Default::default()
        },
    );

    variables.insert(
        "equipmentNeeds".to_string(),
        percent_variable("none", &[("none", 0.0), ("excavator", 300.0)]),
    );
    variables.insert(
        "obstacleRemoval".to_string(),
        percent_variable("none", &[("none", 0.0), ("stumps", 400.0)]),
    );

    RawServiceRecord {
        hourly_labor_rate: Some(25.0),
        optimal_team_size: Some(3),
        base_productivity: Some(50.0),
        base_material_cost: Some(6.0),
        profit_margin: Some(0.20),
        variables,
        ..Default::default()
    }
}

fn engine_with_fixture() -> (Arc<MemoryStore>, PricingEngine) {
    let store = Arc::new(MemoryStore::new());
    store.put("acme", "paverPatio", paver_patio_record());
    let engine = PricingEngine::new(store.clone());
    (store, engine)
}

#[tokio::test]
async fn worked_example_matches_documented_numbers() {
    let (_, engine) = engine_with_fixture();
    let selections = PricingSelections::default();

    // baseHours = (100 / 50) * 3 * 8 = 48
    let plain = engine
        .calculate_pricing(&selections, 100.0, "paverPatio", "acme")
        .await
        .unwrap();
    assert_eq!(plain.labor.base_hours, 48.0);
    assert_eq!(plain.labor.total_hours, 48.0);
    assert_eq!(plain.config_source, ConfigSource::Live);

    // Enabling excavation bundling adds ceil(100/1000) * 12 = 12h
    let bundled = engine
        .calculate_pricing(
            &selections.clone().with_excavation(),
            100.0,
            "paverPatio",
            "acme",
        )
        .await
        .unwrap();
    assert_eq!(bundled.labor.bundled_hours, 12.0);
    assert_eq!(bundled.labor.total_hours, 60.0);
}

#[tokio::test]
async fn determinism_identical_inputs_identical_results() {
    let (_, engine) = engine_with_fixture();
    let selections = PricingSelections::default()
        .select("accessDifficulty", "difficult")
        .select("cuttingComplexity", "extensive")
        .select("materialStyle", "premium")
        .with_excavation();

    let a = engine
        .calculate_pricing(&selections, 777.0, "paverPatio", "acme")
        .await
        .unwrap();
    let b = engine
        .calculate_pricing(&selections, 777.0, "paverPatio", "acme")
        .await
        .unwrap();

    // Bit-identical numeric fields
    assert_eq!(a.labor.total_hours.to_bits(), b.labor.total_hours.to_bits());
    assert_eq!(a.costs.total.to_bits(), b.costs.total.to_bits());
    assert_eq!(a.costs.profit.to_bits(), b.costs.profit.to_bits());
    assert_eq!(a.costs.unit_price.to_bits(), b.costs.unit_price.to_bits());
}

#[tokio::test]
async fn monotonicity_total_never_decreases_with_quantity() {
    let (_, engine) = engine_with_fixture();
    let selections = PricingSelections::default()
        .select("accessDifficulty", "moderate")
        .select("equipmentNeeds", "excavator")
        .with_excavation();

    let mut previous = 0.0;
    for quantity in [10.0, 50.0, 100.0, 500.0, 999.0, 1000.0, 1001.0, 2500.0, 10000.0] {
        let result = engine
            .calculate_pricing(&selections, quantity, "paverPatio", "acme")
            .await
            .unwrap();
        assert!(
            result.costs.total >= previous,
            "total decreased at quantity {}: {} < {}",
            quantity,
            result.costs.total,
            previous
        );
        previous = result.costs.total;
    }
}

#[tokio::test]
async fn base_independence_single_variable_delta() {
    let (_, engine) = engine_with_fixture();

    // Hold everything else fixed, flip accessDifficulty easy -> difficult
    for extra in [
        PricingSelections::default(),
        PricingSelections::default().select("cuttingComplexity", "extensive"),
    ] {
        let easy = engine
            .calculate_pricing(
                &extra.clone().select("accessDifficulty", "easy"),
                200.0,
                "paverPatio",
                "acme",
            )
            .await
            .unwrap();
        let difficult = engine
            .calculate_pricing(
                &extra.clone().select("accessDifficulty", "difficult"),
                200.0,
                "paverPatio",
                "acme",
            )
            .await
            .unwrap();

        // delta = baseHours * 30%, regardless of the other selection
        let expected = easy.labor.base_hours * 0.30;
        assert!(
            (difficult.labor.total_hours - easy.labor.total_hours - expected).abs() < 1e-9,
            "variable effect compounded instead of staying base-relative"
        );
    }
}

#[tokio::test]
async fn fallback_when_store_is_down() {
    let store = Arc::new(MemoryStore::new());
    store.set_failing(true);
    let engine = PricingEngine::new(store);

    let result = engine
        .calculate_pricing(&PricingSelections::default(), 120.0, "paverPatio", "acme")
        .await
        .unwrap();

    assert_eq!(result.config_source, ConfigSource::Fallback);
    assert!(result.costs.total > 0.0);
    assert!(result.costs.unit_price > 0.0);
    assert_eq!(
        result.costs.total,
        round_currency(result.costs.total),
        "currency fields must come out rounded"
    );
}

#[tokio::test]
async fn pass_through_costs_never_receive_markup() {
    let (_, engine) = engine_with_fixture();

    let without = engine
        .calculate_pricing(&PricingSelections::default(), 100.0, "paverPatio", "acme")
        .await
        .unwrap();
    let with = engine
        .calculate_pricing(
            &PricingSelections::default()
                .select("equipmentNeeds", "excavator")
                .select("obstacleRemoval", "stumps"),
            100.0,
            "paverPatio",
            "acme",
        )
        .await
        .unwrap();

    // Profit is computed on the same base in both quotes
    assert_eq!(with.costs.profit, without.costs.profit);
    // 2 project days of excavator rental + flat stump fee
    assert_eq!(with.costs.pass_through_costs, 300.0 * 2.0 + 400.0);
    assert_eq!(
        with.costs.total,
        round_currency(without.costs.total + with.costs.pass_through_costs)
    );
}

#[tokio::test]
async fn excavation_tier_boundaries_via_engine() {
    for (quantity, hours) in [(1.0, 12), (1000.0, 12), (1001.0, 24), (2001.0, 36)] {
        assert_eq!(
            PricingEngine::calculate_excavation_hours(quantity).unwrap(),
            hours
        );
    }
}

#[tokio::test]
async fn config_edit_propagates_through_sync() {
    let (store, engine) = engine_with_fixture();
    let sync = RealtimeSync::new(store.clone(), engine.cache());

    // Prime the cache
    let initial = engine
        .calculate_pricing(&PricingSelections::default(), 100.0, "paverPatio", "acme")
        .await
        .unwrap();
    assert_eq!(initial.costs.labor_cost, 48.0 * 25.0);

    let (subscription, mut updates) = sync.subscribe_channel("paverPatio", "acme").await.unwrap();

    // Double the labor rate in the store
    let mut record = paver_patio_record();
    record.hourly_labor_rate = Some(50.0);
    store.put("acme", "paverPatio", record);

    let fresh = tokio::time::timeout(Duration::from_secs(2), updates.recv())
        .await
        .expect("no update within timeout")
        .expect("update channel closed");
    assert_eq!(fresh.hourly_labor_rate, 50.0);

    // Recomputation without manual cache clearing sees the new rate
    let updated = engine
        .calculate_pricing(&PricingSelections::default(), 100.0, "paverPatio", "acme")
        .await
        .unwrap();
    assert_eq!(updated.costs.labor_cost, 48.0 * 50.0);

    subscription.unsubscribe();
}

#[tokio::test]
async fn rounding_stability_against_unrounded_recomputation() {
    let (_, engine) = engine_with_fixture();
    let selections = PricingSelections::default()
        .select("accessDifficulty", "moderate")
        .select("materialStyle", "premium")
        .select("cuttingComplexity", "extensive");
    let quantity = 173.0;

    let result = engine
        .calculate_pricing(&selections, quantity, "paverPatio", "acme")
        .await
        .unwrap();

    // Recompute the total from unrounded intermediates
    let base_hours = (quantity / 50.0) * 3.0 * 8.0;
    let total_hours = base_hours + 6.0 + base_hours * 0.15;
    let labor = total_hours * 25.0;
    let material = 6.0 * quantity * 1.4;
    let waste = material * 0.15;
    let unrounded_total = (labor + material + waste) * 1.20;

    assert!(
        (result.costs.total - round_currency(unrounded_total)).abs() <= 0.01,
        "reported {} vs recomputed {}",
        result.costs.total,
        unrounded_total
    );
}
