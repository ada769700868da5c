use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Context;
use tokio::time::timeout;
use tollgate_cache::ResponseCache;
use tollgate_config::Config;
use tollgate_core::{Clock, SystemClock, TaskType};
use tollgate_ledger::{BudgetLedger, UsageLog};
use tollgate_ratelimit::{RateLimitError, RouteLimiter};
use tollgate_routing::{
    ModelBackend, ModelRouter, OpenAiBackend, Pricing, QualityGate, Routed, TaskPolicies, UnavailableCause,
};
use tollgate_telemetry::GovernanceMetrics;

use crate::{
    degrade::{GovernFailure, degrade},
    outcome::Governed,
    reporter::UsageReporter,
};

/// Governance service wrapped around every AI call site
///
/// Constructed once at startup and shared; each instance owns its own
/// ledger, cache and usage log.
#[derive(Clone)]
pub struct Governor {
    router: ModelRouter,
    limiter: Arc<RouteLimiter>,
    reporter: UsageReporter,
    ledger: BudgetLedger,
    request_timeout: Duration,
    metrics: GovernanceMetrics,
}

impl Governor {
    pub fn new(
        router: ModelRouter,
        limiter: Arc<RouteLimiter>,
        reporter: UsageReporter,
        ledger: BudgetLedger,
        request_timeout: Duration,
    ) -> Self {
        Self {
            router,
            limiter,
            reporter,
            ledger,
            request_timeout,
            metrics: GovernanceMetrics::new(),
        }
    }

    /// Build a governor talking to the configured model backend
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let backend = Arc::new(OpenAiBackend::new(&config.models));
        Self::with_backend(config, backend, Arc::new(SystemClock))
    }

    /// Build a governor around an existing backend and clock
    pub fn with_backend(config: &Config, backend: Arc<dyn ModelBackend>, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let ledger = BudgetLedger::with_clock(&config.budget, Arc::clone(&clock));
        let usage = UsageLog::new(config.budget.usage_retention, Arc::clone(&clock));
        let cache = ResponseCache::from_config(&config.cache, clock).context("failed to build response cache")?;
        let gate = QualityGate::from_config(&config.quality).context("invalid quality gate configuration")?;

        let limiter = match &config.rate_limit {
            Some(rate_limit) => RouteLimiter::new(rate_limit).context("failed to build rate limiter")?,
            None => RouteLimiter::unlimited(),
        };

        let router = ModelRouter::new(
            backend,
            cache,
            ledger.clone(),
            usage.clone(),
            Pricing::from_config(&config.models),
            gate,
            TaskPolicies::from_config(config),
        );
        let reporter = UsageReporter::new(ledger.clone(), usage, config.budget.thresholds);

        tracing::debug!(
            request_timeout = ?config.server.request_timeout,
            cache_enabled = config.cache.enabled,
            "governor ready"
        );

        Ok(Self::new(
            router,
            Arc::new(limiter),
            reporter,
            ledger,
            config.server.request_timeout,
        ))
    }

    pub const fn reporter(&self) -> &UsageReporter {
        &self.reporter
    }

    pub const fn ledger(&self) -> &BudgetLedger {
        &self.ledger
    }

    pub fn limiter(&self) -> Arc<RouteLimiter> {
        Arc::clone(&self.limiter)
    }

    /// Run one governed AI call
    ///
    /// Never fails: every budget, availability, rate-limit and deadline
    /// problem comes back as [`Governed::Degraded`].
    pub async fn govern(&self, task_type: &str, user_id: &str, prompt: &str) -> Governed {
        let started = Instant::now();
        let task = TaskType::classify(task_type);

        if !task.is_recognized() {
            tracing::warn!(task_type, user_id, "unknown task type, applying conservative policy");
        }

        let (governed, outcome) = match self.run(task, user_id, prompt).await {
            Ok(routed) => {
                let outcome = if routed.cached { "cached" } else { "generated" };
                (Governed::from(routed), outcome)
            }
            Err(failure) => {
                let degradation = degrade(task, &failure);
                tracing::warn!(
                    task_type = %task,
                    user_id,
                    reason = failure.kind(),
                    fallback_action = degradation.fallback_action.as_str(),
                    error = %failure,
                    "degrading governed call"
                );
                (Governed::Degraded(degradation), failure.kind())
            }
        };

        self.metrics.record_outcome(task, outcome, started.elapsed());
        governed
    }

    async fn run(&self, task: TaskType, user_id: &str, prompt: &str) -> Result<Routed, GovernFailure> {
        match self.limiter.check_call(task, user_id).await {
            Ok(()) => {}
            Err((kind, RateLimitError::Exceeded { retry_after })) => {
                return Err(GovernFailure::RateLimited { kind, retry_after });
            }
            Err((kind, e)) => {
                tracing::warn!(limit = ?kind, error = %e, "rate limiter failed, allowing call");
            }
        }

        // Dropping the routing future on deadline releases any open reservation
        timeout(self.request_timeout, self.router.route(task, user_id, prompt))
            .await
            .map_err(|_| GovernFailure::ServiceUnavailable(UnavailableCause::Deadline))?
            .map_err(GovernFailure::from)
    }
}

impl std::fmt::Debug for Governor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Governor")
            .field("router", &self.router)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}
