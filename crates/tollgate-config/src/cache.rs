use std::time::Duration;

use serde::Deserialize;
use url::Url;

/// Response cache configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Bound on every backend operation; a slower lookup counts as a miss
    #[serde(
        default = "default_operation_timeout",
        deserialize_with = "crate::duration::deserialize"
    )]
    pub operation_timeout: Duration,
    #[serde(default)]
    pub backend: CacheBackendConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            operation_timeout: default_operation_timeout(),
            backend: CacheBackendConfig::default(),
        }
    }
}

/// Where cached responses live
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CacheBackendConfig {
    /// In-process cache (single instance only)
    Memory {
        #[serde(default = "default_max_entries")]
        max_entries: u64,
    },
    /// Valkey/Redis (shared between instances)
    Valkey {
        url: Url,
        #[serde(default = "default_key_prefix")]
        key_prefix: String,
    },
}

impl Default for CacheBackendConfig {
    fn default() -> Self {
        Self::Memory {
            max_entries: default_max_entries(),
        }
    }
}

#[allow(clippy::missing_const_for_fn)]
fn default_enabled() -> bool {
    true
}

const fn default_operation_timeout() -> Duration {
    Duration::from_millis(250)
}

const fn default_max_entries() -> u64 {
    10_000
}

fn default_key_prefix() -> String {
    "tollgate:cache".to_owned()
}
