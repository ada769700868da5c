#![allow(clippy::must_use_candidate)]

pub mod budget;
pub mod cache;
mod duration;
mod env;
mod loader;
pub mod models;
pub mod quality;
pub mod rate_limit;
pub mod server;
pub mod tasks;
pub mod telemetry;

use indexmap::IndexMap;
use serde::Deserialize;
use tollgate_core::TaskType;

pub use budget::*;
pub use cache::*;
pub use models::*;
pub use quality::*;
pub use rate_limit::*;
pub use server::*;
pub use tasks::*;
pub use telemetry::{ExportProtocol, ExporterConfig, TelemetryConfig};

/// Top-level tollgate configuration
///
/// Read once at startup. Nothing in here is mutated at runtime;
/// changing a limit or a task policy requires a reload.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Budget scope limits and windows
    #[serde(default)]
    pub budget: BudgetConfig,
    /// Remote model backend and per-tier pricing
    pub models: ModelsConfig,
    /// Task type descriptor overrides keyed by task type
    #[serde(default)]
    pub tasks: IndexMap<TaskType, TaskDescriptorConfig>,
    /// Conservative policy for task types outside the known set
    #[serde(default = "TaskDescriptorConfig::conservative")]
    pub task_defaults: TaskDescriptorConfig,
    /// Quality gate heuristics
    #[serde(default)]
    pub quality: QualityConfig,
    /// Response cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Route-level rate limiting
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}

impl Config {
    /// Resolve the descriptor for a task type
    ///
    /// Configured entries win over the built-in table; unrecognized
    /// task types always get `task_defaults`.
    pub fn descriptor(&self, task: TaskType) -> TaskDescriptorConfig {
        if !task.is_recognized() {
            return self.task_defaults.clone();
        }

        self.tasks
            .get(&task)
            .cloned()
            .unwrap_or_else(|| TaskDescriptorConfig::builtin(task))
    }
}
