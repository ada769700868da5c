use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;
use tollgate_core::TaskType;
use url::Url;

/// Request rate limiting in front of the governed route
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    #[serde(default)]
    pub storage: RateLimitStorage,
    /// Limit across all callers, answered with 429
    #[serde(default)]
    pub global: Option<RequestRateLimit>,
    /// Limit per user id, answered with a degraded response
    #[serde(default)]
    pub per_user: Option<RequestRateLimit>,
    /// Per-user limits for individual task types
    #[serde(default)]
    pub tasks: IndexMap<TaskType, RequestRateLimit>,
}

/// Rate limit storage backend
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RateLimitStorage {
    /// In-memory storage (single instance only)
    #[default]
    Memory,
    /// Redis-backed storage (distributed)
    Redis {
        url: Url,
        #[serde(default = "default_key_prefix")]
        key_prefix: String,
    },
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestRateLimit {
    /// Maximum requests per window
    pub requests: u32,
    /// Window duration (e.g. "1m", "1h")
    #[serde(deserialize_with = "crate::duration::deserialize")]
    pub window: Duration,
}

fn default_key_prefix() -> String {
    "tollgate:ratelimit".to_owned()
}
