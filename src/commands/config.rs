use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::collections::HashMap;
use std::path::Path;

use quote_engine::config::{normalize, validate_config, ConfigSource, RawServiceRecord};
use quote_engine::engine::PricingEngine;

/// Print a company's normalized configuration as JSON.
pub async fn show(fixture: Option<&Path>, service: &str, company: &str) -> Result<()> {
    let store = super::build_store(fixture)?;
    let engine = PricingEngine::new(store);

    let config = engine.load_config(service, company).await;
    println!("{}", serde_json::to_string_pretty(&*config)?);
    Ok(())
}

/// Validate every record in the fixture after normalization.
pub fn validate(fixture: Option<&Path>) -> Result<()> {
    let Some(path) = fixture else {
        bail!("config validate requires --fixture");
    };

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let records: HashMap<String, RawServiceRecord> =
        serde_json::from_str(&raw).context("Fixture is not a valid record map")?;

    let mut failures = 0;
    for (key, record) in &records {
        let Some((company, service)) = key.split_once(':') else {
            println!("{} {} (expected 'company:service' key)", "INVALID".red(), key);
            failures += 1;
            continue;
        };

        let config = normalize(company, service, record.clone(), ConfigSource::Live);
        match validate_config(&config) {
            Ok(()) => println!("{} {}", "OK".green(), key),
            Err(e) => {
                println!("{} {}: {}", "INVALID".red(), key, e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} records failed validation", failures, records.len());
    }
    println!("{} records validated", records.len());
    Ok(())
}
