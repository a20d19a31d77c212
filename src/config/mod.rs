//! Configuration loading and logging setup.

mod loader;
pub mod logging;
mod types;

pub use loader::{load_config, load_config_from_str};
pub use logging::init_logging;
pub use types::{
    AppConfig, ExchangeConfig, FailureConfig, FailureModes, LatencyPreset, PricingModelConfig,
    ServerConfig,
};
