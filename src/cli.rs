use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "quoter", version, about = "Contracting service quote engine")]
pub struct Cli {
    /// JSON fixture backing the configuration store
    #[arg(short, long, global = true)]
    pub fixture: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Compute a priced estimate for a service
    Quote {
        /// Service to price (e.g. paverPatio)
        #[arg(short, long, default_value = "paverPatio")]
        service: String,

        /// Company whose configuration to use
        #[arg(short, long)]
        company: Option<String>,

        /// Quantity of work (e.g. square feet)
        #[arg(short, long)]
        quantity: f64,

        /// Variable selection as name=optionKey (repeatable)
        #[arg(long = "select", value_parser = parse_selection)]
        selections: Vec<(String, String)>,

        /// Bundle excavation hours and cost into the quote
        #[arg(long)]
        include_excavation: bool,

        /// Print the full result as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Compute standalone excavation hours and cost
    Excavation {
        /// Area in square feet
        #[arg(short, long)]
        quantity: f64,

        #[arg(short, long)]
        company: Option<String>,

        /// Override the configured excavation depth (inches)
        #[arg(short, long)]
        depth: Option<f64>,
    },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Display a company's normalized service configuration
    Show {
        #[arg(short, long, default_value = "paverPatio")]
        service: String,

        #[arg(short, long)]
        company: Option<String>,
    },

    /// Validate every record in the fixture
    Validate,
}

fn parse_selection(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, option)) if !name.is_empty() && !option.is_empty() => {
            Ok((name.to_string(), option.to_string()))
        }
        _ => Err(format!("expected name=optionKey, got '{raw}'")),
    }
}
