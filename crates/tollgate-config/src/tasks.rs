use std::time::Duration;

use serde::Deserialize;
use tollgate_core::TaskType;

/// Policy attached to a task type
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskDescriptorConfig {
    /// Maximum output tokens requested from a model
    pub token_ceiling: u32,
    /// How long a generated response stays reusable; zero disables caching
    #[serde(deserialize_with = "crate::duration::deserialize")]
    pub cache_ttl: Duration,
    /// Whether the expensive tier may be used
    #[serde(default)]
    pub critical: bool,
    /// Per-invocation model timeout
    #[serde(default = "default_timeout", deserialize_with = "crate::duration::deserialize")]
    pub timeout: Duration,
    /// Responses shorter than this fail the quality gate
    #[serde(default = "default_min_response_chars")]
    pub min_response_chars: usize,
}

impl TaskDescriptorConfig {
    /// Built-in policy for a known task type
    pub fn builtin(task: TaskType) -> Self {
        let (token_ceiling, cache_ttl_secs, critical, timeout_secs, min_response_chars) = match task {
            TaskType::ItineraryGeneration => (4_000, 7 * 24 * 3600, true, 60, 200),
            TaskType::AssistantReply => (800, 3600, false, 20, 20),
            TaskType::ConsensusAnalysis => (600, 15 * 60, false, 20, 40),
            TaskType::PollSuggestion => (400, 30 * 60, false, 15, 20),
            TaskType::EmergencyReplanning => (2_000, 10 * 60, true, 45, 80),
            TaskType::Unrecognized => return Self::conservative(),
        };

        Self {
            token_ceiling,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            critical,
            timeout: Duration::from_secs(timeout_secs),
            min_response_chars,
        }
    }

    /// Policy for task types outside the known set: small ceiling, no
    /// caching, cheap tier only
    pub const fn conservative() -> Self {
        Self {
            token_ceiling: 256,
            cache_ttl: Duration::ZERO,
            critical: false,
            timeout: default_timeout(),
            min_response_chars: 1,
        }
    }
}

const fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

const fn default_min_response_chars() -> usize {
    1
}
