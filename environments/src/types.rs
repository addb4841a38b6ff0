use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

pub type EnvironmentId = i64;

/// Named OAuth2 configurations of an environment, keyed by the placeholder name.
pub type AuthConfigs = HashMap<String, OAuth2Config>;

#[derive(thiserror::Error, Debug)]
#[error("malformed {field} payload: {source}")]
pub struct PayloadError {
    pub field: &'static str,
    #[source]
    pub source: serde_json::Error,
}

/// An environment as stored by the persistence backend.
///
/// `variables` and `auth_configs` are JSON documents embedded as strings and are
/// only parsed when requested.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub id: EnvironmentId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub variables: Option<String>,
    #[serde(default)]
    pub auth_configs: Option<String>,
}

impl Environment {
    /// Parses the auth configuration payload.
    ///
    /// Returns `Ok(None)` when the environment has no auth configuration: the
    /// payload is absent, blank or a JSON `null`.
    pub fn auth_configs(&self) -> Result<Option<AuthConfigs>, PayloadError> {
        parse_payload("authConfigs", self.auth_configs.as_deref())
    }

    /// Parses the variables payload, dropping entries without a key.
    pub fn variables(&self) -> Result<Vec<Variable>, PayloadError> {
        let variables: Option<Vec<Variable>> =
            parse_payload("variables", self.variables.as_deref())?;

        Ok(variables
            .unwrap_or_default()
            .into_iter()
            .filter(|v| !v.key.is_empty())
            .collect())
    }
}

fn parse_payload<T>(field: &'static str, payload: Option<&str>) -> Result<Option<T>, PayloadError>
where
    T: for<'de> Deserialize<'de>,
{
    match payload.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => serde_json::from_str(raw).map_err(|source| PayloadError { field, source }),
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Variable {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// Client-credentials configuration for a token endpoint.
#[derive(Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OAuth2Config {
    #[serde(default)]
    pub token_url: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub grant_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl fmt::Debug for OAuth2Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Config")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("grant_type", &self.grant_type)
            .field("scope", &self.scope)
            .finish()
    }
}
