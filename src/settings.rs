use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Process-level settings for the `quoter` binary. Distinct from the
/// per-company pricing configuration in [`crate::config`], which lives in
/// the external store.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub log_level: String,
    pub log_format: String,
    /// Company used when the CLI is invoked without `--company`
    pub default_company: String,
    /// JSON fixture backing the in-memory store
    pub fixture_path: Option<PathBuf>,
}

/// Load settings from `quoter.toml` (optional) layered with `QUOTER__*`
/// environment variables.
pub fn load_settings() -> anyhow::Result<Settings> {
    let settings = config::Config::builder()
        .set_default("log_level", "info")?
        .set_default("log_format", "text")?
        .set_default("default_company", "default")?
        .add_source(config::File::with_name("quoter").required(false))
        .add_source(config::Environment::with_prefix("QUOTER").separator("__"))
        .build()?;

    let settings: Settings = settings.try_deserialize()?;
    validate_settings(&settings)?;

    Ok(settings)
}

fn validate_settings(settings: &Settings) -> anyhow::Result<()> {
    match settings.log_format.as_str() {
        "text" | "json" => {}
        other => anyhow::bail!("log_format must be 'text' or 'json', got '{}'", other),
    }
    if settings.default_company.is_empty() {
        anyhow::bail!("default_company cannot be empty");
    }
    Ok(())
}
