use crate::config::OutboundConfig;
use crate::errors::{EnvironmentResolutionError, InvalidMethodError, TransportFailure};
use crate::metrics_defs::{RELAY_DURATION, RELAY_REQUESTS};
use crate::placeholder::{PlaceholderResolver, Substitutions};
use crate::token_broker::TokenBroker;
use crate::types::{ProxyRequest, ProxyResponse};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use environments::{EnvironmentId, EnvironmentStore};
use http::Method;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Sends user-authored requests to arbitrary origins, substituting environment
/// placeholders in the URL and header values first.
pub struct Relay {
    client: reqwest::Client,
    broker: TokenBroker,
    environments: Arc<dyn EnvironmentStore>,
}

impl Relay {
    pub fn new(
        config: &OutboundConfig,
        environments: Arc<dyn EnvironmentStore>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Relay {
            broker: TokenBroker::new(client.clone()),
            client,
            environments,
        })
    }

    pub fn token_broker(&self) -> &TokenBroker {
        &self.broker
    }

    /// Relays `request` and reports what happened.
    ///
    /// Upstream error statuses and transport failures are both reported through the
    /// returned `ProxyResponse`; only an unknown method is an error, and it is detected
    /// before any I/O takes place.
    pub async fn execute(&self, request: ProxyRequest) -> Result<ProxyResponse, InvalidMethodError> {
        let started = Instant::now();

        let method = parse_method(&request.method).inspect_err(|_| {
            metrics::counter!(RELAY_REQUESTS.name, "outcome" => "invalid_method").increment(1);
        })?;

        let ProxyRequest {
            url,
            headers,
            body,
            environment_id,
            ..
        } = request;
        let headers = headers.unwrap_or_default();

        let (url, headers) = match self.substitutions(environment_id).await {
            Some(substitutions) => {
                let resolver = PlaceholderResolver::new(&self.broker, &substitutions);
                let url = resolver.resolve(&url).await;

                let mut resolved = IndexMap::with_capacity(headers.len());
                for (name, value) in headers {
                    let value = resolver.resolve(&value).await;
                    resolved.insert(name, value);
                }
                (url, resolved)
            }
            None => (url, headers),
        };

        tracing::debug!(
            method = %method,
            host = host_of(&url).as_deref().unwrap_or("<invalid>"),
            headers = ?headers.keys().collect::<Vec<_>>(),
            "Dispatching relay request"
        );

        let (response, outcome) = match self.dispatch(method, &url, &headers, body).await {
            Ok(response) => (response, "completed"),
            Err(e) => {
                tracing::warn!(
                    host = host_of(&url).as_deref().unwrap_or("<invalid>"),
                    error = %e,
                    "Relay request failed"
                );
                (transport_failure_response(&e), "transport_failed")
            }
        };

        metrics::counter!(RELAY_REQUESTS.name, "outcome" => outcome).increment(1);
        metrics::histogram!(RELAY_DURATION.name).record(started.elapsed().as_secs_f64());

        Ok(response)
    }

    /// Placeholder values of the request's environment, or `None` when there is
    /// nothing to substitute. Lookup and payload failures skip substitution.
    async fn substitutions(&self, environment_id: Option<EnvironmentId>) -> Option<Substitutions> {
        let id = environment_id?;

        match self.load_substitutions(id).await {
            Ok(Some(substitutions)) => Some(substitutions),
            Ok(None) => {
                tracing::debug!(environment_id = id, "Environment has nothing to substitute");
                None
            }
            Err(e) => {
                tracing::warn!(
                    environment_id = id,
                    error = %e,
                    "Skipping placeholder substitution"
                );
                None
            }
        }
    }

    async fn load_substitutions(
        &self,
        id: EnvironmentId,
    ) -> Result<Option<Substitutions>, EnvironmentResolutionError> {
        let environment = self.environments.get(id).await?;
        let auth_configs = environment.auth_configs()?.unwrap_or_default();

        let variables: HashMap<String, String> = match environment.variables() {
            Ok(variables) => variables.into_iter().map(|v| (v.key, v.value)).collect(),
            Err(e) => {
                tracing::warn!(environment_id = id, error = %e, "Ignoring environment variables");
                HashMap::new()
            }
        };

        tracing::debug!(
            environment_id = id,
            auth_configs = ?auth_configs.keys().collect::<Vec<_>>(),
            variables = variables.len(),
            "Loaded environment"
        );

        let substitutions = Substitutions {
            auth_configs,
            variables,
        };
        Ok((!substitutions.is_empty()).then_some(substitutions))
    }

    async fn dispatch(
        &self,
        method: Method,
        url: &str,
        headers: &IndexMap<String, String>,
        body: Option<String>,
    ) -> Result<ProxyResponse, TransportFailure> {
        let mut header_map = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| TransportFailure::InvalidHeaderName(name.clone()))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| TransportFailure::InvalidHeaderValue(name.clone()))?;
            header_map.append(header_name, header_value);
        }

        let mut builder = self.client.request(method, url).headers(header_map);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        // Resolved URLs may carry substituted values, so they stay out of error messages.
        let response = builder.send().await.map_err(reqwest::Error::without_url)?;
        let status = response.status().as_u16();
        let headers = flatten_headers(response.headers());
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());
        let payload = response.bytes().await.map_err(reqwest::Error::without_url)?;

        Ok(ProxyResponse {
            status,
            headers,
            body: encode_body(content_type.as_deref(), &payload),
        })
    }
}

pub fn parse_method(method: &str) -> Result<Method, InvalidMethodError> {
    match method.to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "HEAD" => Ok(Method::HEAD),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "PATCH" => Ok(Method::PATCH),
        "DELETE" => Ok(Method::DELETE),
        "OPTIONS" => Ok(Method::OPTIONS),
        "TRACE" => Ok(Method::TRACE),
        _ => Err(InvalidMethodError(method.to_string())),
    }
}

/// Text, JSON and XML pass through as-is; anything else becomes a base64 data URI
/// so the body always fits in a JSON string.
pub fn encode_body(content_type: Option<&str>, payload: &[u8]) -> Option<String> {
    if payload.is_empty() {
        return None;
    }

    let content_type = content_type.map(str::trim).filter(|c| !c.is_empty());
    match content_type {
        Some(content_type) if is_textual(content_type) => {
            Some(String::from_utf8_lossy(payload).into_owned())
        }
        _ => Some(format!(
            "data:{};base64,{}",
            content_type.unwrap_or(DEFAULT_CONTENT_TYPE),
            STANDARD.encode(payload)
        )),
    }
}

fn is_textual(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let Some((kind, subtype)) = essence.split_once('/') else {
        return false;
    };

    kind == "text"
        || matches!(subtype, "json" | "xml")
        || subtype.ends_with("+json")
        || subtype.ends_with("+xml")
}

/// One value per header name; the first one wins.
fn flatten_headers(headers: &HeaderMap) -> IndexMap<String, String> {
    let mut flat = IndexMap::with_capacity(headers.keys_len());
    for (name, value) in headers {
        flat.entry(name.as_str().to_string())
            .or_insert_with(|| String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    flat
}

fn transport_failure_response(err: &TransportFailure) -> ProxyResponse {
    ProxyResponse {
        status: 500,
        headers: IndexMap::new(),
        body: Some(err.to_string()),
    }
}

fn host_of(url: &str) -> Option<String> {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(String::from))
}
