use std::time::Duration;

use serde::Deserialize;
use tollgate_core::Cost;

/// Spend limits for the three budget scopes
///
/// Limits are in USD. Daily windows share a single reset hour so the
/// user and system scopes always roll over together.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BudgetConfig {
    /// Hour of the day (UTC) at which daily windows begin
    #[serde(default)]
    pub reset_hour_utc: u8,
    /// How long usage events are kept for reporting; must cover the
    /// longest budget window
    #[serde(
        default = "default_usage_retention",
        deserialize_with = "crate::duration::deserialize"
    )]
    pub usage_retention: Duration,
    #[serde(default)]
    pub request: RequestScopeConfig,
    #[serde(default = "DailyScopeConfig::default_user")]
    pub user_daily: DailyScopeConfig,
    #[serde(default = "DailyScopeConfig::default_system")]
    pub system_daily: DailyScopeConfig,
    /// Fractions of a limit at which reporting changes status
    #[serde(default)]
    pub thresholds: ThresholdConfig,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            reset_hour_utc: 0,
            usage_retention: default_usage_retention(),
            request: RequestScopeConfig::default(),
            user_daily: DailyScopeConfig::default_user(),
            system_daily: DailyScopeConfig::default_system(),
            thresholds: ThresholdConfig::default(),
        }
    }
}

/// Per-request ceiling, spanning every tier attempt of one request
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestScopeConfig {
    pub limit: Cost,
}

impl Default for RequestScopeConfig {
    fn default() -> Self {
        Self {
            limit: Cost::from_micros(250_000),
        }
    }
}

/// A windowed scope (user or system)
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DailyScopeConfig {
    pub limit: Cost,
    #[serde(default = "default_window", deserialize_with = "crate::duration::deserialize")]
    pub window: Duration,
}

impl DailyScopeConfig {
    fn default_user() -> Self {
        Self {
            limit: Cost::from_micros(500_000),
            window: default_window(),
        }
    }

    fn default_system() -> Self {
        Self {
            limit: Cost::from_micros(50_000_000),
            window: default_window(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdConfig {
    #[serde(default = "default_warning")]
    pub warning: f64,
    #[serde(default = "default_critical")]
    pub critical: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            warning: default_warning(),
            critical: default_critical(),
        }
    }
}

const fn default_usage_retention() -> Duration {
    Duration::from_secs(7 * 24 * 60 * 60)
}

const fn default_window() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

const fn default_warning() -> f64 {
    0.8
}

const fn default_critical() -> f64 {
    0.95
}
