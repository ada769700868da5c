use std::time::Duration;

use jiff::Timestamp;

use crate::error::RateLimitError;

/// Fixed-window counter in Redis, shared between instances
///
/// Each window gets its own key, so a counter never outlives its window
/// even if an expiry is lost.
#[derive(Clone)]
pub struct RedisLimiter {
    client: redis::Client,
    key_prefix: String,
    max_requests: u32,
    window_secs: u64,
}

impl RedisLimiter {
    pub fn new(url: &str, key_prefix: &str, max_requests: u32, window: Duration) -> Result<Self, RateLimitError> {
        let client = redis::Client::open(url).map_err(|e| RateLimitError::Redis(format!("invalid URL: {e}")))?;

        Ok(Self {
            client,
            key_prefix: key_prefix.to_owned(),
            max_requests,
            window_secs: window.as_secs().max(1),
        })
    }

    pub async fn check(&self, key: &str) -> Result<(), RateLimitError> {
        let now = u64::try_from(Timestamp::now().as_second()).unwrap_or(0);
        let index = now / self.window_secs;
        let retry_after = (index + 1) * self.window_secs - now;
        let counter_key = format!("{}:{key}:{index}", self.key_prefix);

        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| RateLimitError::Redis(format!("connection failed: {e}")))?;

        let (count,): (u32,) = redis::pipe()
            .atomic()
            .incr(&counter_key, 1)
            .expire(&counter_key, i64::try_from(self.window_secs).unwrap_or(i64::MAX))
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| RateLimitError::Redis(format!("INCR failed: {e}")))?;

        if count > self.max_requests {
            return Err(RateLimitError::Exceeded {
                retry_after: retry_after.max(1),
            });
        }

        Ok(())
    }
}

impl std::fmt::Debug for RedisLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisLimiter")
            .field("key_prefix", &self.key_prefix)
            .field("max_requests", &self.max_requests)
            .field("window_secs", &self.window_secs)
            .finish_non_exhaustive()
    }
}
