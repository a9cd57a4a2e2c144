pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use error::EngineError;
pub use services::classifier::{ClosingRule, DeliveryMethod, TagClassification};
pub use services::engine::{Engine, EngineConfig};
pub use services::platform::{BillingApiClient, InvoicingPlatform, PlatformConfig};

/// Initialize tracing for the process, filtered via `RUST_LOG`.
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
