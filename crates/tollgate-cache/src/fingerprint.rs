use std::fmt;

use sha2::{Digest, Sha256};
use tollgate_core::TaskType;

/// Hex-encoded SHA-256 digest identifying a cache entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the cache key for a task type and prompt
///
/// Leading and trailing whitespace is ignored and internal whitespace
/// runs count as a single space, so prompts that differ only in
/// formatting share an entry. Case is preserved.
pub fn fingerprint(task: TaskType, prompt: &str) -> CacheKey {
    let mut hasher = Sha256::new();
    hasher.update(task.as_str().as_bytes());
    hasher.update([0]);

    for (i, word) in prompt.split_whitespace().enumerate() {
        if i > 0 {
            hasher.update(b" ");
        }
        hasher.update(word.as_bytes());
    }

    CacheKey(format!("{:x}", hasher.finalize()))
}
