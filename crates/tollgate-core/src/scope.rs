use std::fmt;

use serde::{Deserialize, Serialize};

/// An independent budget boundary
///
/// A charge only proceeds when every applicable scope has headroom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetScope {
    /// Spend of a single governed call, across all tier attempts
    Request,
    /// Spend of one user within the current daily window
    UserDaily,
    /// Spend of the whole system within the current daily window
    SystemDaily,
}

impl BudgetScope {
    /// All scopes in lock order
    pub const ALL: [Self; 3] = [Self::Request, Self::UserDaily, Self::SystemDaily];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::UserDaily => "user_daily",
            Self::SystemDaily => "system_daily",
        }
    }
}

impl fmt::Display for BudgetScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
