// Client-credentials token cache shared by all relay calls.
//
// Entries are keyed by the auth config's name only. Two environments that define a
// config with the same name share one cache slot, whichever token endpoint they use.
// Expired entries are not evicted; they are replaced the next time the name is used.
use crate::errors::TokenAcquisitionError;
use crate::metrics_defs::{TOKEN_CACHE_HIT, TOKEN_CACHE_MISS, TOKEN_FETCH_FAILURE};
use environments::OAuth2Config;
use moka::sync::Cache;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::time::{Duration, Instant};

/// A cached token is only handed out while it has at least this much lifetime left.
pub const EXPIRY_BUFFER: Duration = Duration::from_secs(30);
/// Lifetime assumed when the token endpoint does not report a usable `expires_in`.
pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(3600);
pub const DEFAULT_GRANT_TYPE: &str = "client_credentials";

#[derive(Clone)]
pub struct CachedToken {
    pub token: String,
    pub expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at > now + EXPIRY_BUFFER
    }
}

impl fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<Value>,
}

#[derive(Clone)]
pub struct TokenBroker {
    client: reqwest::Client,
    cache: Cache<String, CachedToken>,
}

impl TokenBroker {
    pub fn new(client: reqwest::Client) -> Self {
        // Neither capacity nor TTL: an entry lives until a refreshed token replaces it.
        let cache = Cache::builder().build();

        TokenBroker { client, cache }
    }

    /// Returns a bearer token for `config_key`, requesting a new one from the
    /// token endpoint when the cached token is missing or about to expire.
    ///
    /// Concurrent callers that miss the cache each fetch their own token and the
    /// last one to finish wins the cache slot.
    pub async fn get_token(
        &self,
        config_key: &str,
        config: &OAuth2Config,
    ) -> Result<String, TokenAcquisitionError> {
        if let Some(cached) = self.cache.get(config_key)
            && cached.is_fresh(Instant::now())
        {
            metrics::counter!(TOKEN_CACHE_HIT.name).increment(1);
            tracing::debug!(config = config_key, "Using cached token");
            return Ok(cached.token);
        }

        metrics::counter!(TOKEN_CACHE_MISS.name).increment(1);
        tracing::info!(
            config = config_key,
            client_id = %config.client_id,
            "Fetching new token"
        );

        match self.fetch(config).await {
            Ok(fresh) => {
                let token = fresh.token.clone();
                self.cache.insert(config_key.to_string(), fresh);
                Ok(token)
            }
            Err(e) => {
                metrics::counter!(TOKEN_FETCH_FAILURE.name).increment(1);
                tracing::warn!(config = config_key, error = %e, "Failed to fetch token");
                Err(e)
            }
        }
    }

    /// The cache entry for `config_key`, fresh or not.
    pub fn cached(&self, config_key: &str) -> Option<CachedToken> {
        self.cache.get(config_key)
    }

    async fn fetch(&self, config: &OAuth2Config) -> Result<CachedToken, TokenAcquisitionError> {
        let grant_type = config.grant_type.as_deref().unwrap_or(DEFAULT_GRANT_TYPE);

        let mut form = vec![
            ("grant_type", grant_type),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
        ];
        if let Some(scope) = config.scope.as_deref().filter(|s| !s.is_empty()) {
            form.push(("scope", scope));
        }

        let response = self
            .client
            .post(&config.token_url)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TokenAcquisitionError::Status { status, body });
        }

        let body = response.bytes().await?;
        let parsed: TokenResponse = serde_json::from_slice(&body)?;
        let token = parsed
            .access_token
            .ok_or(TokenAcquisitionError::MissingAccessToken)?;

        let expires_at = Instant::now()
            .checked_add(lifetime(parsed.expires_in.as_ref()))
            .ok_or(TokenAcquisitionError::ExpiryOutOfRange)?;

        Ok(CachedToken { token, expires_at })
    }
}

fn lifetime(expires_in: Option<&Value>) -> Duration {
    let secs = expires_in.and_then(|v| {
        v.as_i64()
            .or_else(|| v.as_f64().map(|f| f as i64))
            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
    });

    match secs {
        Some(secs) if secs > 0 => Duration::from_secs(secs as u64),
        _ => DEFAULT_LIFETIME,
    }
}
