//! Read-only access to workspace environments: their variables and the named
//! OAuth2 client-credentials configurations used by the relay.

pub mod client;
pub mod config;
pub mod store;
pub mod types;

use client::HttpEnvironmentStore;
use config::EnvironmentStoreConfig;
use std::sync::Arc;
use std::time::Duration;

pub use store::{EnvironmentError, EnvironmentStore, StaticEnvironmentStore};
pub use types::{AuthConfigs, Environment, EnvironmentId, OAuth2Config, PayloadError, Variable};

pub fn from_config(
    config: EnvironmentStoreConfig,
) -> Result<Arc<dyn EnvironmentStore>, EnvironmentError> {
    match config {
        EnvironmentStoreConfig::File { path } => {
            Ok(Arc::new(StaticEnvironmentStore::from_file(&path)?))
        }
        EnvironmentStoreConfig::Url { url, timeout_secs } => Ok(Arc::new(
            HttpEnvironmentStore::new(url, Duration::from_secs(timeout_secs))?,
        )),
    }
}
