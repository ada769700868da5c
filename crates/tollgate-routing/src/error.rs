use thiserror::Error;
use tollgate_ledger::BudgetExceeded;

use crate::quality::QualityFailure;

/// Reason a governed call did not produce text
#[derive(Debug, Error)]
pub enum RoutingError {
    /// The cheap-tier reservation was refused
    #[error(transparent)]
    BudgetExceeded(#[from] BudgetExceeded),

    /// No tier produced an acceptable response
    #[error("service unavailable: {cause}")]
    ServiceUnavailable { cause: UnavailableCause },
}

impl RoutingError {
    pub const fn unavailable(cause: UnavailableCause) -> Self {
        Self::ServiceUnavailable { cause }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnavailableCause {
    #[error("model backend failed: {0}")]
    Backend(String),

    #[error("model call timed out")]
    Timeout,

    #[error("response rejected: {0}")]
    QualityGate(QualityFailure),

    /// Escalation was refused by the ledger
    #[error("no budget left for escalation: {0}")]
    EscalationBudget(BudgetExceeded),

    /// The end-to-end request deadline elapsed
    #[error("request deadline elapsed")]
    Deadline,
}
