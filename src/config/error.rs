//! Configuration error types.

use thiserror::Error;

/// Errors while loading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Semantic validation failures on loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("broker endpoint URL must not be empty")]
    EmptyEndpoint,

    #[error("broker endpoint URL must use ws://, wss://, http:// or https://, got '{0}'")]
    InvalidEndpointScheme(String),

    #[error("'{field}' must be greater than zero")]
    ZeroInterval { field: &'static str },

    #[error("API base URL must use http:// or https://, got '{0}'")]
    InvalidApiUrl(String),

    #[error("API page size must be between 1 and 500, got {0}")]
    InvalidPageSize(u32),
}
