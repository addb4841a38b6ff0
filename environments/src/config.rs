use serde::Deserialize;
use std::path::PathBuf;
use url::Url;

fn default_timeout_secs() -> u64 {
    5
}

/// Where environments are read from.
#[derive(Clone, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
#[serde(tag = "type")]
pub enum EnvironmentStoreConfig {
    /// JSON export of environments, loaded once at startup.
    File { path: PathBuf },
    /// Persistence backend, queried on every relay call that names an environment.
    Url {
        url: Url,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}
