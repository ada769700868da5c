use std::time::Duration;

use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};
use tollgate_core::ModelTier;

/// A stored generation
///
/// Entries are immutable; writing the same key again replaces the entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub text: String,
    /// Tier that produced the text
    pub tier: ModelTier,
    pub model: String,
    pub created_at: Timestamp,
    /// Lifetime in seconds
    pub ttl_secs: u64,
}

impl CacheEntry {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn expires_at(&self) -> Timestamp {
        let ttl = i64::try_from(self.ttl_secs).unwrap_or(i64::MAX);
        self.created_at
            .checked_add(SignedDuration::from_secs(ttl))
            .unwrap_or(Timestamp::MAX)
    }

    pub fn is_fresh(&self, now: Timestamp) -> bool {
        now < self.expires_at()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freshness_ends_at_expiry() {
        let entry = CacheEntry {
            text: "ok".to_owned(),
            tier: ModelTier::Cheap,
            model: "small".to_owned(),
            created_at: "2026-01-01T00:00:00Z".parse().unwrap(),
            ttl_secs: 60,
        };

        assert!(entry.is_fresh("2026-01-01T00:00:59Z".parse().unwrap()));
        assert!(!entry.is_fresh("2026-01-01T00:01:00Z".parse().unwrap()));
    }
}
