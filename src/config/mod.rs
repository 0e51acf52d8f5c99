//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Values are read with the `ORDERDECK`
//! prefix and nested sections use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use orderdeck_live::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod api;
mod broker;
mod error;

pub use api::ApiConfig;
pub use broker::BrokerConfig;
pub use error::{ConfigError, ValidationError};

use serde::Deserialize;

/// Root configuration for the notification pipeline.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Broker connection and reconnection settings.
    #[serde(default)]
    pub broker: BrokerConfig,

    /// REST orders API settings.
    #[serde(default)]
    pub api: ApiConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads a `.env` file if present, then environment variables:
    /// `ORDERDECK__BROKER__ENDPOINT_URL`, `ORDERDECK__API__BASE_URL`, and
    /// so on. Every value has a default, so an empty environment loads.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("ORDERDECK")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration sections.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.broker.validate()?;
        self.api.validate()?;
        Ok(())
    }
}
