pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod excavation;
pub mod metrics;
pub mod models;
pub mod settings;
pub mod store;
pub mod sync;
pub mod tier1;
pub mod tier2;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing/logging
///
/// Note: This function can only be called once per process.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
