//! Metrics emitted by the relay.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Histogram,
}

#[derive(Debug, Clone, Copy)]
pub struct MetricDef {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub description: &'static str,
}

pub const RELAY_REQUESTS: MetricDef = MetricDef {
    name: "relay.requests",
    metric_type: MetricType::Counter,
    description: "Relay calls. Tagged with outcome: completed, transport_failed or invalid_method",
};

pub const RELAY_DURATION: MetricDef = MetricDef {
    name: "relay.duration",
    metric_type: MetricType::Histogram,
    description: "Time to relay a request in seconds, including placeholder substitution",
};

pub const TOKEN_CACHE_HIT: MetricDef = MetricDef {
    name: "token_cache.hit",
    metric_type: MetricType::Counter,
    description: "Token lookups served from the cache",
};

pub const TOKEN_CACHE_MISS: MetricDef = MetricDef {
    name: "token_cache.miss",
    metric_type: MetricType::Counter,
    description: "Token lookups that required a request to the token endpoint",
};

pub const TOKEN_FETCH_FAILURE: MetricDef = MetricDef {
    name: "token.fetch.failure",
    metric_type: MetricType::Counter,
    description: "Token endpoint requests that did not yield an access token",
};

pub const ALL_METRICS: &[MetricDef] = &[
    RELAY_REQUESTS,
    RELAY_DURATION,
    TOKEN_CACHE_HIT,
    TOKEN_CACHE_MISS,
    TOKEN_FETCH_FAILURE,
];
