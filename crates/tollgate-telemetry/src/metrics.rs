//! Governance metric names and instruments

use std::time::Duration;

use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use tollgate_core::{Cost, ModelTier, TaskType};

pub const GOVERN_OUTCOME_COUNT: &str = "tollgate.govern.outcome.count";
pub const GOVERN_DURATION: &str = "tollgate.govern.duration";
pub const MODEL_SPEND: &str = "tollgate.model.spend";
pub const MODEL_TOKEN_USAGE: &str = "tollgate.model.token.usage";
pub const CACHE_LOOKUP_COUNT: &str = "tollgate.cache.lookup.count";

/// Instruments recorded by the router and interceptor
///
/// Resolved from the global meter, so they are no-ops until an OTLP
/// exporter has been installed.
#[derive(Clone)]
pub struct GovernanceMetrics {
    outcomes: Counter<u64>,
    duration: Histogram<f64>,
    spend: Counter<f64>,
    tokens: Counter<u64>,
    cache_lookups: Counter<u64>,
}

impl GovernanceMetrics {
    pub fn new() -> Self {
        let meter = global::meter("tollgate");

        Self {
            outcomes: meter
                .u64_counter(GOVERN_OUTCOME_COUNT)
                .with_description("Governed calls by task type and outcome")
                .build(),
            duration: meter
                .f64_histogram(GOVERN_DURATION)
                .with_description("End-to-end duration of governed calls")
                .with_unit("s")
                .build(),
            spend: meter
                .f64_counter(MODEL_SPEND)
                .with_description("Measured model spend")
                .with_unit("USD")
                .build(),
            tokens: meter
                .u64_counter(MODEL_TOKEN_USAGE)
                .with_description("Model tokens consumed")
                .build(),
            cache_lookups: meter
                .u64_counter(CACHE_LOOKUP_COUNT)
                .with_description("Response cache lookups by result")
                .build(),
        }
    }

    /// Record a finished governed call
    pub fn record_outcome(&self, task: TaskType, outcome: &'static str, elapsed: Duration) {
        let attributes = [
            KeyValue::new("task_type", task.as_str()),
            KeyValue::new("outcome", outcome),
        ];
        self.outcomes.add(1, &attributes);
        self.duration.record(elapsed.as_secs_f64(), &attributes);
    }

    /// Record one billed model invocation
    pub fn record_spend(&self, task: TaskType, tier: ModelTier, cost: Cost, input_tokens: u32, output_tokens: u32) {
        let attributes = [
            KeyValue::new("task_type", task.as_str()),
            KeyValue::new("tier", tier.as_str()),
        ];
        self.spend.add(cost.as_usd(), &attributes);

        for (kind, count) in [("input", input_tokens), ("output", output_tokens)] {
            self.tokens.add(
                u64::from(count),
                &[
                    KeyValue::new("task_type", task.as_str()),
                    KeyValue::new("tier", tier.as_str()),
                    KeyValue::new("kind", kind),
                ],
            );
        }
    }

    pub fn record_cache_lookup(&self, task: TaskType, hit: bool) {
        self.cache_lookups.add(
            1,
            &[
                KeyValue::new("task_type", task.as_str()),
                KeyValue::new("result", if hit { "hit" } else { "miss" }),
            ],
        );
    }
}

impl Default for GovernanceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GovernanceMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GovernanceMetrics").finish_non_exhaustive()
    }
}
