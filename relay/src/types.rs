use environments::EnvironmentId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A request description authored by a user, to be sent to `url` on their behalf.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub headers: Option<IndexMap<String, String>>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub environment_id: Option<EnvironmentId>,
}

/// What the relay observed: the upstream's answer, or a synthetic 500 when there was none.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ProxyResponse {
    pub status: u16,
    pub headers: IndexMap<String, String>,
    pub body: Option<String>,
}
