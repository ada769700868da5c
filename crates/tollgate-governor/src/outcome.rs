use serde::Serialize;
use tollgate_core::{Cost, ModelTier};
use tollgate_routing::Routed;

use crate::degrade::Degradation;

/// Result handed back to a feature
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Governed {
    Generated {
        text: String,
        /// Zero when served from cache
        cost: Cost,
        cached: bool,
        tier: ModelTier,
    },
    Degraded(Degradation),
}

impl Governed {
    pub const fn is_generated(&self) -> bool {
        matches!(self, Self::Generated { .. })
    }

    pub const fn degradation(&self) -> Option<&Degradation> {
        match self {
            Self::Degraded(degradation) => Some(degradation),
            Self::Generated { .. } => None,
        }
    }
}

impl From<Routed> for Governed {
    fn from(routed: Routed) -> Self {
        Self::Generated {
            text: routed.text,
            cost: routed.cost,
            cached: routed.cached,
            tier: routed.tier,
        }
    }
}
