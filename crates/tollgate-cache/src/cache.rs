use std::{future::Future, sync::Arc, time::Duration};

use tollgate_config::{CacheBackendConfig, CacheConfig};
use tollgate_core::{Clock, ModelTier, TaskType};

use crate::{
    backend::{CacheBackend, CacheError},
    entry::CacheEntry,
    fingerprint::{CacheKey, fingerprint},
    memory::MemoryBackend,
    valkey::ValkeyBackend,
};

/// Response cache with bounded, failure-tolerant lookups
#[derive(Clone)]
pub struct ResponseCache {
    backend: Option<Arc<dyn CacheBackend>>,
    operation_timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl ResponseCache {
    pub fn new(backend: Arc<dyn CacheBackend>, operation_timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend: Some(backend),
            operation_timeout,
            clock,
        }
    }

    /// A cache that never stores anything
    pub fn disabled(clock: Arc<dyn Clock>) -> Self {
        Self {
            backend: None,
            operation_timeout: Duration::ZERO,
            clock,
        }
    }

    pub fn from_config(config: &CacheConfig, clock: Arc<dyn Clock>) -> Result<Self, CacheError> {
        if !config.enabled {
            return Ok(Self::disabled(clock));
        }

        let backend: Arc<dyn CacheBackend> = match &config.backend {
            CacheBackendConfig::Memory { max_entries } => Arc::new(MemoryBackend::new(*max_entries)),
            CacheBackendConfig::Valkey { url, key_prefix } => {
                Arc::new(ValkeyBackend::new(url.as_str(), key_prefix.clone())?)
            }
        };

        Ok(Self::new(backend, config.operation_timeout, clock))
    }

    pub const fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn fingerprint(&self, task: TaskType, prompt: &str) -> CacheKey {
        fingerprint(task, prompt)
    }

    /// Look up a fresh entry
    ///
    /// Expired entries, backend errors and lookups slower than the
    /// operation timeout are all misses.
    pub async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let backend = self.backend.as_ref()?;

        let entry = self.bounded("get", backend.name(), key, backend.get(key.as_str())).await??;

        if entry.is_fresh(self.clock.now()) {
            tracing::debug!(cache_key = %key, tier = %entry.tier, "cache hit");
            return Some(entry);
        }

        tracing::debug!(cache_key = %key, expired_at = %entry.expires_at(), "cache entry expired");
        self.bounded("remove", backend.name(), key, backend.remove(key.as_str()))
            .await;

        None
    }

    /// Store a generation under `key`, replacing any previous entry
    ///
    /// A zero TTL disables caching for the call.
    pub async fn put(&self, key: &CacheKey, text: &str, tier: ModelTier, model: &str, ttl: Duration) {
        let Some(backend) = &self.backend else {
            return;
        };

        if ttl.is_zero() {
            tracing::debug!(cache_key = %key, "caching disabled for task, skipping store");
            return;
        }

        let entry = CacheEntry {
            text: text.to_owned(),
            tier,
            model: model.to_owned(),
            created_at: self.clock.now(),
            ttl_secs: ttl.as_secs().max(1),
        };

        if self
            .bounded("put", backend.name(), key, backend.put(key.as_str(), &entry))
            .await
            .is_some()
        {
            tracing::debug!(cache_key = %key, ttl_secs = entry.ttl_secs, "cached response");
        }
    }

    /// Run a backend operation under the timeout, logging failures
    async fn bounded<T>(
        &self,
        operation: &'static str,
        backend: &'static str,
        key: &CacheKey,
        fut: impl Future<Output = Result<T, CacheError>>,
    ) -> Option<T> {
        match tokio::time::timeout(self.operation_timeout, fut).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, backend, operation, cache_key = %key, "cache backend error, treating as miss");
                None
            }
            Err(_) => {
                tracing::warn!(
                    backend,
                    operation,
                    cache_key = %key,
                    timeout_ms = u64::try_from(self.operation_timeout.as_millis()).unwrap_or(u64::MAX),
                    "cache backend timed out, treating as miss"
                );
                None
            }
        }
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("backend", &self.backend.as_ref().map(|b| b.name()))
            .field("operation_timeout", &self.operation_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use tollgate_core::ManualClock;

    use super::*;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new("2026-06-01T08:00:00Z".parse().unwrap()))
    }

    fn memory(clock: Arc<ManualClock>) -> ResponseCache {
        ResponseCache::new(Arc::new(MemoryBackend::new(100)), Duration::from_millis(250), clock)
    }

    #[tokio::test]
    async fn stored_entry_is_served_until_ttl() {
        let clock = clock();
        let cache = memory(clock.clone());
        let key = cache.fingerprint(TaskType::ConsensusAnalysis, "vote summary");

        assert!(cache.get(&key).await.is_none());

        cache
            .put(&key, "Most prefer the beach.", ModelTier::Cheap, "small", Duration::from_secs(600))
            .await;

        let hit = cache.get(&key).await.unwrap();
        assert_eq!(hit.text, "Most prefer the beach.");
        assert_eq!(hit.tier, ModelTier::Cheap);

        clock.advance(Duration::from_secs(599));
        assert!(cache.get(&key).await.is_some());

        clock.advance(Duration::from_secs(1));
        assert!(cache.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn put_overwrites() {
        let cache = memory(clock());
        let key = cache.fingerprint(TaskType::AssistantReply, "hi");

        cache.put(&key, "first", ModelTier::Cheap, "small", Duration::from_secs(60)).await;
        cache.put(&key, "second", ModelTier::Expensive, "large", Duration::from_secs(60)).await;

        let hit = cache.get(&key).await.unwrap();
        assert_eq!(hit.text, "second");
        assert_eq!(hit.tier, ModelTier::Expensive);
    }

    #[tokio::test]
    async fn zero_ttl_is_not_stored() {
        let cache = memory(clock());
        let key = cache.fingerprint(TaskType::Unrecognized, "anything");

        cache.put(&key, "text", ModelTier::Cheap, "small", Duration::ZERO).await;
        assert!(cache.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn disabled_cache_always_misses() {
        let cache = ResponseCache::disabled(clock());
        let key = cache.fingerprint(TaskType::AssistantReply, "hi");

        cache.put(&key, "text", ModelTier::Cheap, "small", Duration::from_secs(60)).await;
        assert!(cache.get(&key).await.is_none());
        assert!(!cache.is_enabled());
    }

    struct FailingBackend {
        calls: AtomicU32,
    }

    #[async_trait]
    impl CacheBackend for FailingBackend {
        async fn get(&self, _key: &str) -> Result<Option<CacheEntry>, CacheError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Err(CacheError::Backend("connection refused".to_owned()))
        }

        async fn put(&self, _key: &str, _entry: &CacheEntry) -> Result<(), CacheError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Err(CacheError::Backend("connection refused".to_owned()))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[tokio::test]
    async fn backend_errors_are_misses() {
        let backend = Arc::new(FailingBackend { calls: AtomicU32::new(0) });
        let cache = ResponseCache::new(backend.clone(), Duration::from_millis(250), clock());
        let key = cache.fingerprint(TaskType::AssistantReply, "hi");

        cache.put(&key, "text", ModelTier::Cheap, "small", Duration::from_secs(60)).await;
        assert!(cache.get(&key).await.is_none());
        assert_eq!(backend.calls.load(Ordering::Relaxed), 2);
    }

    struct StalledBackend;

    #[async_trait]
    impl CacheBackend for StalledBackend {
        async fn get(&self, _key: &str) -> Result<Option<CacheEntry>, CacheError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(None)
        }

        async fn put(&self, _key: &str, _entry: &CacheEntry) -> Result<(), CacheError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        }

        fn name(&self) -> &'static str {
            "stalled"
        }
    }

    #[tokio::test]
    async fn slow_backend_is_a_miss() {
        let cache = ResponseCache::new(Arc::new(StalledBackend), Duration::from_millis(20), clock());
        let key = cache.fingerprint(TaskType::AssistantReply, "hi");

        let started = std::time::Instant::now();
        assert!(cache.get(&key).await.is_none());
        cache.put(&key, "text", ModelTier::Cheap, "small", Duration::from_secs(60)).await;
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn config_selects_backend() {
        let memory = ResponseCache::from_config(&CacheConfig::default(), clock()).unwrap();
        assert!(memory.is_enabled());

        let off = CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        };
        assert!(!ResponseCache::from_config(&off, clock()).unwrap().is_enabled());
    }
}
