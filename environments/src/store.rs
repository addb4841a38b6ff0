use crate::types::{Environment, EnvironmentId};
use async_trait::async_trait;
use http::StatusCode;
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum EnvironmentError {
    #[error("environment {0} not found")]
    NotFound(EnvironmentId),
    #[error("HTTP client error: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("environment store responded with {0}")]
    UnexpectedStatus(StatusCode),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("could not parse environments: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Read-only lookup of environments by id.
#[async_trait]
pub trait EnvironmentStore: Send + Sync {
    async fn get(&self, id: EnvironmentId) -> Result<Environment, EnvironmentError>;
}

/// Environments held in memory, typically loaded once from an export file.
#[derive(Default)]
pub struct StaticEnvironmentStore {
    environments: HashMap<EnvironmentId, Environment>,
}

impl StaticEnvironmentStore {
    pub fn new<I>(environments: I) -> Self
    where
        I: IntoIterator<Item = Environment>,
    {
        StaticEnvironmentStore {
            environments: environments.into_iter().map(|e| (e.id, e)).collect(),
        }
    }

    /// Loads a JSON array of environments, as returned by the backend's list endpoint.
    pub fn from_file(path: &Path) -> Result<Self, EnvironmentError> {
        let file = File::open(path)?;
        let environments: Vec<Environment> = serde_json::from_reader(io::BufReader::new(file))?;
        tracing::info!(
            path = %path.display(),
            count = environments.len(),
            "Loaded environments from file"
        );

        Ok(Self::new(environments))
    }

    pub fn len(&self) -> usize {
        self.environments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.environments.is_empty()
    }
}

#[async_trait]
impl EnvironmentStore for StaticEnvironmentStore {
    async fn get(&self, id: EnvironmentId) -> Result<Environment, EnvironmentError> {
        self.environments
            .get(&id)
            .cloned()
            .ok_or(EnvironmentError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_static_store_from_file() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(
            tmp,
            r#"[
                {{"id": 1, "name": "dev", "variables": "[]"}},
                {{"id": 2, "name": "prod", "authConfigs": "{{}}"}}
            ]"#
        )
        .expect("write json");

        let store = StaticEnvironmentStore::from_file(tmp.path()).unwrap();
        assert_eq!(store.len(), 2);

        let prod = store.get(2).await.unwrap();
        assert_eq!(prod.name, "prod");
        assert_eq!(prod.auth_configs.as_deref(), Some("{}"));

        assert!(matches!(
            store.get(3).await,
            Err(EnvironmentError::NotFound(3))
        ));
    }

    #[test]
    fn test_static_store_invalid_file() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "{{\"id\": 1}}").expect("write json");

        assert!(matches!(
            StaticEnvironmentStore::from_file(tmp.path()),
            Err(EnvironmentError::ParseError(_))
        ));

        assert!(matches!(
            StaticEnvironmentStore::from_file(Path::new("/nonexistent/environments.json")),
            Err(EnvironmentError::IoError(_))
        ));
    }
}
