use serde::Serialize;
use tollgate_config::ThresholdConfig;
use tollgate_core::Cost;
use tollgate_ledger::{BudgetLedger, ScopeKey, ScopeLimit, ScopeSnapshot, TierSpend, UsageLog};

/// Read-only view of budget consumption for dashboards
///
/// Every call reads the ledger directly; nothing is cached here and
/// nothing here feeds back into gating.
#[derive(Clone)]
pub struct UsageReporter {
    ledger: BudgetLedger,
    usage: UsageLog,
    thresholds: ThresholdConfig,
}

/// Budget standing of one scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageStats {
    /// Committed spend plus estimates held by in-flight calls, the same
    /// amount the ledger gates on
    pub budget_used: Cost,
    /// In-flight share of `budget_used`
    pub reserved: Cost,
    pub budget_limit: Cost,
    pub remaining_quota: Cost,
    pub current_tier_thresholds: TierThresholds,
    pub status: BudgetStatus,
    pub requests: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub spend_by_tier: TierSpend,
}

/// Amounts at which the status changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierThresholds {
    pub warning: Cost,
    pub critical: Cost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    Normal,
    Warning,
    Critical,
    Exhausted,
}

impl UsageReporter {
    pub fn new(ledger: BudgetLedger, usage: UsageLog, thresholds: ThresholdConfig) -> Self {
        Self {
            ledger,
            usage,
            thresholds,
        }
    }

    /// System-wide standing in the current daily window
    pub fn global_stats(&self) -> UsageStats {
        let snapshot = self.ledger.snapshot(ScopeKey::System);
        self.stats(&snapshot, None)
    }

    /// Standing of one user in the current daily window
    pub fn user_stats(&self, user_id: &str) -> UsageStats {
        let snapshot = self.ledger.snapshot(ScopeKey::User(user_id));
        self.stats(&snapshot, Some(user_id))
    }

    pub fn scope_limits(&self) -> Vec<ScopeLimit> {
        self.ledger.scope_limits()
    }

    fn stats(&self, snapshot: &ScopeSnapshot, user_id: Option<&str>) -> UsageStats {
        let summary = self.usage.summary(snapshot.window_start, user_id);
        let used = snapshot.committed + snapshot.reserved;
        let thresholds = TierThresholds {
            warning: fraction(snapshot.limit, self.thresholds.warning),
            critical: fraction(snapshot.limit, self.thresholds.critical),
        };

        let status = if snapshot.remaining.is_zero() {
            BudgetStatus::Exhausted
        } else if used >= thresholds.critical {
            BudgetStatus::Critical
        } else if used >= thresholds.warning {
            BudgetStatus::Warning
        } else {
            BudgetStatus::Normal
        };

        UsageStats {
            budget_used: used,
            reserved: snapshot.reserved,
            budget_limit: snapshot.limit,
            remaining_quota: snapshot.remaining,
            current_tier_thresholds: thresholds,
            status,
            requests: summary.requests,
            input_tokens: summary.input_tokens,
            output_tokens: summary.output_tokens,
            spend_by_tier: summary.spend_by_tier,
        }
    }
}

fn fraction(limit: Cost, share: f64) -> Cost {
    Cost::from_usd(limit.as_usd() * share)
}

impl std::fmt::Debug for UsageReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageReporter")
            .field("thresholds", &self.thresholds)
            .finish_non_exhaustive()
    }
}
