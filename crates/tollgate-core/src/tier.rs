use std::fmt;

use serde::{Deserialize, Serialize};

/// Quality/cost level of the remote model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    /// Attempted first for every task
    Cheap,
    /// Fallback reserved for critical tasks
    Expensive,
}

impl ModelTier {
    /// Stable lowercase label used in logs, metrics and JSON
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cheap => "cheap",
            Self::Expensive => "expensive",
        }
    }
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
