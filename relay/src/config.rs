use environments::config::EnvironmentStoreConfig;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("{0} must be greater than 0")]
    ZeroTimeout(&'static str),
}

/// Relay service configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for the relay endpoint
    #[serde(default)]
    pub listener: Listener,
    /// Settings for calls to target origins and token endpoints
    #[serde(default)]
    pub outbound: OutboundConfig,
    /// Source of environments referenced by relay requests
    pub environment_store: EnvironmentStoreConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.outbound.validate()
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "127.0.0.1".into(),
            port: 3000,
        }
    }
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

/// Outbound HTTP client settings.
///
/// The timeout applies to the whole exchange, so a target that stops responding
/// yields a transport failure after `timeout_secs` at the latest.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutboundConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub max_redirects: usize,
}

impl Default for OutboundConfig {
    fn default() -> Self {
        OutboundConfig {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            max_redirects: 5,
        }
    }
}

impl OutboundConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.timeout_secs == 0 {
            return Err(ValidationError::ZeroTimeout("timeout_secs"));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ValidationError::ZeroTimeout("connect_timeout_secs"));
        }
        Ok(())
    }
}
