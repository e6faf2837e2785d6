use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use quote_engine::{init_tracing, settings};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let settings = settings::load_settings()?;
    init_tracing(settings.log_format == "json");
    quote_engine::metrics::init_metric_descriptions();

    // CLI flag wins over the settings file
    let fixture = args.fixture.clone().or(settings.fixture_path.clone());
    let fixture = fixture.as_deref();

    match args.command {
        cli::Commands::Quote {
            service,
            company,
            quantity,
            selections,
            include_excavation,
            json,
        } => {
            let company = company.unwrap_or(settings.default_company);
            commands::quote::execute(
                fixture,
                &service,
                &company,
                quantity,
                &selections,
                include_excavation,
                json,
            )
            .await?;
        }
        cli::Commands::Excavation {
            quantity,
            company,
            depth,
        } => {
            let company = company.unwrap_or(settings.default_company);
            commands::excavation::execute(fixture, quantity, &company, depth).await?;
        }
        cli::Commands::Config { action } => match action {
            cli::ConfigCommands::Show { service, company } => {
                let company = company.unwrap_or(settings.default_company);
                commands::config::show(fixture, &service, &company).await?;
            }
            cli::ConfigCommands::Validate => commands::config::validate(fixture)?,
        },
        cli::Commands::Version => {
            println!("Quote Engine v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
