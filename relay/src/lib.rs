//! HTTP request relay.
//!
//! Accepts request descriptions authored in the browser, substitutes `{{name}}`
//! placeholders from the referenced environment (OAuth2 bearer tokens or plain
//! variables) and sends them to the target origin, reporting the outcome as data.

pub mod api;
pub mod config;
pub mod errors;
pub mod metrics_defs;
pub mod placeholder;
pub mod relay;
pub mod token_broker;
pub mod types;

#[cfg(test)]
mod testutils;

use config::Config;
use errors::RelayServiceError;
use relay::Relay;

pub async fn run(config: Config) -> Result<(), RelayServiceError> {
    let environments = environments::from_config(config.environment_store)?;
    let relay = Relay::new(&config.outbound, environments)?;
    api::serve(&config.listener, relay).await
}
