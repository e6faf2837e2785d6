use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use quote_engine::engine::PricingEngine;
use quote_engine::models::PricingSelections;

#[allow(clippy::too_many_arguments)]
pub async fn execute(
    fixture: Option<&Path>,
    service: &str,
    company: &str,
    quantity: f64,
    selections: &[(String, String)],
    include_excavation: bool,
    json: bool,
) -> Result<()> {
    let store = super::build_store(fixture)?;
    let engine = PricingEngine::new(store);

    let mut pricing_selections = PricingSelections::default();
    for (name, option) in selections {
        pricing_selections = pricing_selections.select(name, option);
    }
    if include_excavation {
        pricing_selections = pricing_selections.with_excavation();
    }

    let result = engine
        .calculate_pricing(&pricing_selections, quantity, service, company)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!(
        "{} {} for {} ({} units)",
        "Quote:".bold(),
        service.cyan(),
        company,
        quantity
    );
    println!("  config source: {:?}", result.config_source);
    println!();

    println!("{}", "Labor".bold());
    for step in &result.labor.breakdown_steps {
        println!("  {}", step.dimmed());
    }
    println!(
        "  {} {:.2}h over {:.2} days",
        "total:".bold(),
        result.labor.total_hours,
        result.labor.total_days
    );
    println!();

    let costs = &result.costs;
    println!("{}", "Costs".bold());
    println!("  labor             {:>12.2}", costs.labor_cost);
    println!("  materials         {:>12.2}", costs.material_cost_base);
    println!("  material waste    {:>12.2}", costs.material_waste_cost);
    if costs.bundled_cost > 0.0 {
        println!("  bundled service   {:>12.2}", costs.bundled_cost);
    }
    if costs.pass_through_costs > 0.0 {
        println!("  pass-through      {:>12.2}", costs.pass_through_costs);
    }
    println!("  profit            {:>12.2}", costs.profit);
    println!(
        "  {} {}",
        "total:".bold(),
        format!("{:>12.2}", costs.total).green().bold()
    );
    println!("  per unit          {:>12.2}", costs.unit_price);

    Ok(())
}
