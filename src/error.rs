use thiserror::Error;

/// Pricing core error types.
///
/// Only caller contract violations and store/subscription transport failures
/// surface as errors. Recoverable conditions (missing configuration, unknown
/// option keys, bundled sub-calculation failures) are handled inside the
/// pipeline and never abort a quote.
#[derive(Debug, Error)]
pub enum PricingError {
    /// Quantity must be a finite number greater than zero
    #[error("invalid quantity: {0} (must be a finite number > 0)")]
    InvalidQuantity(f64),

    /// Configuration store lookup failed
    #[error("configuration store unavailable: {0}")]
    StoreUnavailable(String),

    /// Real-time subscription could not be established
    #[error("subscription failed for {company_id}:{service_name}: {reason}")]
    Subscription {
        company_id: String,
        service_name: String,
        reason: String,
    },

    /// Malformed configuration record
    #[error("invalid configuration record: {0}")]
    InvalidConfig(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl PricingError {
    /// Stable machine-readable name for metrics labels
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidQuantity(_) => "invalid_quantity",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::Subscription { .. } => "subscription_failure",
            Self::InvalidConfig(_) => "invalid_config",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl From<serde_json::Error> for PricingError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidConfig(format!("JSON error: {}", err))
    }
}
