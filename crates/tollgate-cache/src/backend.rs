use async_trait::async_trait;
use thiserror::Error;

use crate::entry::CacheEntry;

/// Cache errors
#[derive(Debug, Error)]
pub enum CacheError {
    /// Valkey connection or command error
    #[error("cache backend: {0}")]
    Backend(String),
    /// Entry could not be encoded or decoded
    #[error("serialization: {0}")]
    Serialization(String),
}

/// Storage behind the response cache
///
/// Backends store entries as given; freshness is judged by the caller.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;

    async fn put(&self, key: &str, entry: &CacheEntry) -> Result<(), CacheError>;

    /// Purge an entry found to be stale; backends that expire entries
    /// on their own keep the default
    async fn remove(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }

    /// Backend name for logs
    fn name(&self) -> &'static str;
}
