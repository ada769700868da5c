use async_trait::async_trait;
use redis::AsyncCommands;

use crate::{
    backend::{CacheBackend, CacheError},
    entry::CacheEntry,
};

/// Valkey/Redis backend shared between instances
///
/// Entries are stored as JSON with a server-side expiry matching their
/// TTL, so stale entries are purged without a sweep.
#[derive(Clone)]
pub struct ValkeyBackend {
    client: redis::Client,
    key_prefix: String,
}

impl ValkeyBackend {
    pub fn new(url: &str, key_prefix: impl Into<String>) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(|e| CacheError::Backend(format!("invalid URL: {e}")))?;

        Ok(Self {
            client,
            key_prefix: key_prefix.into(),
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{key}", self.key_prefix)
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, CacheError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| CacheError::Backend(format!("connection failed: {e}")))
    }
}

#[async_trait]
impl CacheBackend for ValkeyBackend {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let mut conn = self.connection().await?;

        let raw: Option<String> = conn
            .get(self.key(key))
            .await
            .map_err(|e| CacheError::Backend(format!("GET failed: {e}")))?;

        raw.map(|data| {
            serde_json::from_str(&data).map_err(|e| CacheError::Serialization(format!("deserialize: {e}")))
        })
        .transpose()
    }

    async fn put(&self, key: &str, entry: &CacheEntry) -> Result<(), CacheError> {
        let data = serde_json::to_string(entry).map_err(|e| CacheError::Serialization(format!("serialize: {e}")))?;
        let mut conn = self.connection().await?;

        let _: () = conn
            .set_ex(self.key(key), data, entry.ttl_secs.max(1))
            .await
            .map_err(|e| CacheError::Backend(format!("SET failed: {e}")))?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "valkey"
    }
}

impl std::fmt::Debug for ValkeyBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValkeyBackend")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}
