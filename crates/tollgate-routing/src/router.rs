use std::sync::Arc;

use tokio::time::timeout;
use tollgate_cache::{CacheKey, ResponseCache};
use tollgate_config::TaskDescriptorConfig;
use tollgate_core::{Cost, ModelTier, TaskType};
use tollgate_ledger::{BudgetExceeded, BudgetLedger, RequestScope, UsageLog};
use tollgate_telemetry::GovernanceMetrics;

use crate::{
    backend::{Generation, ModelBackend},
    error::{RoutingError, UnavailableCause},
    pricing::Pricing,
    quality::{QualityFailure, QualityGate},
    tasks::TaskPolicies,
};

/// Text produced for a governed call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routed {
    pub text: String,
    /// Cost of the tier that produced `text`; zero for cache hits
    pub cost: Cost,
    pub cached: bool,
    pub tier: ModelTier,
}

/// Chooses between the cheap and expensive tier for each call
#[derive(Clone)]
pub struct ModelRouter {
    backend: Arc<dyn ModelBackend>,
    cache: ResponseCache,
    ledger: BudgetLedger,
    usage: UsageLog,
    pricing: Pricing,
    gate: QualityGate,
    policies: TaskPolicies,
    metrics: GovernanceMetrics,
}

/// One governed call in flight
struct Call<'a> {
    task: TaskType,
    user_id: &'a str,
    prompt: &'a str,
    policy: &'a TaskDescriptorConfig,
    request: RequestScope,
}

/// A tier call that produced billable output
struct Attempt {
    generation: Generation,
    cost: Cost,
}

enum AttemptFailure {
    Budget(BudgetExceeded),
    Unavailable(UnavailableCause),
}

impl ModelRouter {
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        cache: ResponseCache,
        ledger: BudgetLedger,
        usage: UsageLog,
        pricing: Pricing,
        gate: QualityGate,
        policies: TaskPolicies,
    ) -> Self {
        Self {
            backend,
            cache,
            ledger,
            usage,
            pricing,
            gate,
            policies,
            metrics: GovernanceMetrics::new(),
        }
    }

    pub fn policy(&self, task: TaskType) -> &TaskDescriptorConfig {
        self.policies.get(task)
    }

    /// Produce text for a prompt, spending as little as the task allows
    ///
    /// Cache hits never touch the ledger. The expensive tier is only
    /// tried for critical task types, under its own reservation.
    pub async fn route(&self, task: TaskType, user_id: &str, prompt: &str) -> Result<Routed, RoutingError> {
        let policy = self.policies.get(task);

        let key = (self.cache.is_enabled() && !policy.cache_ttl.is_zero()).then(|| self.cache.fingerprint(task, prompt));

        if let Some(key) = &key {
            let entry = self.cache.get(key).await;
            self.metrics.record_cache_lookup(task, entry.is_some());

            if let Some(entry) = entry {
                tracing::debug!(task_type = %task, user_id, tier = %entry.tier, "serving cached response");
                return Ok(Routed {
                    text: entry.text,
                    cost: Cost::ZERO,
                    cached: true,
                    tier: entry.tier,
                });
            }
        }

        let call = Call {
            task,
            user_id,
            prompt,
            policy,
            request: self.ledger.request_scope(),
        };

        let cheap_failure = match self.attempt(&call, ModelTier::Cheap).await {
            Ok(attempt) => match self.gate.check(
                &attempt.generation.text,
                policy.min_response_chars,
                attempt.generation.input_tokens,
            ) {
                Ok(()) => return Ok(self.finish(&call, key.as_ref(), ModelTier::Cheap, attempt).await),
                Err(failure) => {
                    tracing::warn!(task_type = %task, user_id, reason = %failure, "cheap tier failed the quality gate");
                    UnavailableCause::QualityGate(failure)
                }
            },
            Err(AttemptFailure::Budget(exceeded)) => return Err(exceeded.into()),
            Err(AttemptFailure::Unavailable(cause)) => cause,
        };

        if !policy.critical {
            tracing::info!(task_type = %task, user_id, cause = %cheap_failure, "not escalating non-critical task");
            return Err(RoutingError::unavailable(cheap_failure));
        }

        tracing::info!(task_type = %task, user_id, cause = %cheap_failure, "escalating to expensive tier");

        match self.attempt(&call, ModelTier::Expensive).await {
            Ok(attempt) if !attempt.generation.text.trim().is_empty() => {
                Ok(self.finish(&call, key.as_ref(), ModelTier::Expensive, attempt).await)
            }
            Ok(_) => Err(RoutingError::unavailable(UnavailableCause::QualityGate(QualityFailure::Empty))),
            Err(AttemptFailure::Budget(exceeded)) => {
                tracing::warn!(task_type = %task, user_id, scope = %exceeded.scope, "escalation refused by budget");
                Err(RoutingError::unavailable(UnavailableCause::EscalationBudget(exceeded)))
            }
            Err(AttemptFailure::Unavailable(cause)) => Err(RoutingError::unavailable(cause)),
        }
    }

    /// Reserve, invoke and settle one tier
    ///
    /// The reservation is released if the call fails or times out and
    /// committed with the measured cost otherwise.
    async fn attempt(&self, call: &Call<'_>, tier: ModelTier) -> Result<Attempt, AttemptFailure> {
        let estimate = self.pricing.estimate(tier, call.prompt, call.policy.token_ceiling);
        let reservation = self
            .ledger
            .reserve(&call.request, call.user_id, estimate)
            .map_err(AttemptFailure::Budget)?;

        let invoked = timeout(
            call.policy.timeout,
            self.backend.invoke(tier, call.prompt, call.policy.token_ceiling),
        )
        .await;

        let generation = match invoked {
            Ok(Ok(generation)) => generation,
            Ok(Err(e)) => {
                reservation.release();
                tracing::warn!(task_type = %call.task, tier = %tier, error = %e, "model call failed");
                return Err(AttemptFailure::Unavailable(UnavailableCause::Backend(e.to_string())));
            }
            Err(_) => {
                reservation.release();
                tracing::warn!(
                    task_type = %call.task,
                    tier = %tier,
                    timeout = ?call.policy.timeout,
                    "model call timed out"
                );
                return Err(AttemptFailure::Unavailable(UnavailableCause::Timeout));
            }
        };

        let cost = self.pricing.cost(tier, generation.input_tokens, generation.output_tokens);
        let settlement = reservation.commit(cost);
        if settlement.clamped {
            tracing::warn!(
                task_type = %call.task,
                tier = %tier,
                estimate = %estimate,
                cost = %cost,
                charged = %settlement.charged,
                "call cost more than the budget could absorb"
            );
        }

        self.usage.record(
            call.task,
            tier,
            self.backend.model(tier),
            call.user_id,
            generation.input_tokens,
            generation.output_tokens,
            cost,
        );
        self.metrics
            .record_spend(call.task, tier, cost, generation.input_tokens, generation.output_tokens);

        Ok(Attempt { generation, cost })
    }

    async fn finish(&self, call: &Call<'_>, key: Option<&CacheKey>, tier: ModelTier, attempt: Attempt) -> Routed {
        if let Some(key) = key {
            self.cache
                .put(key, &attempt.generation.text, tier, self.backend.model(tier), call.policy.cache_ttl)
                .await;
        }

        tracing::info!(
            task_type = %call.task,
            user_id = call.user_id,
            tier = %tier,
            cost = %attempt.cost,
            "generated response"
        );

        Routed {
            text: attempt.generation.text,
            cost: attempt.cost,
            cached: false,
            tier,
        }
    }
}

impl std::fmt::Debug for ModelRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRouter")
            .field("pricing", &self.pricing)
            .field("policies", &self.policies)
            .finish_non_exhaustive()
    }
}
