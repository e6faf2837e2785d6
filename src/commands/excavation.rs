use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use quote_engine::engine::PricingEngine;

pub async fn execute(
    fixture: Option<&Path>,
    quantity: f64,
    company: &str,
    depth: Option<f64>,
) -> Result<()> {
    let store = super::build_store(fixture)?;
    let engine = PricingEngine::new(store);

    let hours = PricingEngine::calculate_excavation_hours(quantity)?;
    let cost = engine
        .calculate_excavation_cost(quantity, company, depth)
        .await?;

    println!(
        "{} {} sqft at {}\" depth",
        "Excavation:".bold(),
        quantity,
        cost.depth
    );
    println!("  labor             {:>10}h", hours);
    println!("  volume            {:>10.2} yd3", cost.volume);
    println!("  rate              {:>10.2} /yd3", cost.rate);
    println!("  cost              {:>10.2}", cost.cost);
    println!("  profit            {:>10.2}", cost.profit);
    println!(
        "  {} {}",
        "total:".bold(),
        format!("{:>10.2}", cost.total).green().bold()
    );

    Ok(())
}
