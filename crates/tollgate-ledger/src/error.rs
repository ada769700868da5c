use tollgate_core::{BudgetScope, Cost};

/// A reservation was refused because at least one scope lacks headroom
///
/// `scope` is the broadest scope that failed; `failed` lists every
/// failing scope in lock order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("budget exceeded for {scope} scope (requested {requested}, remaining {remaining})")]
pub struct BudgetExceeded {
    pub scope: BudgetScope,
    pub failed: Vec<BudgetScope>,
    /// Estimated cost that was asked for
    pub requested: Cost,
    /// Headroom left in `scope`
    pub remaining: Cost,
}
