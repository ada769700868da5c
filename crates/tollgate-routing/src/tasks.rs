use std::collections::HashMap;

use tollgate_config::{Config, TaskDescriptorConfig};
use tollgate_core::TaskType;

/// Resolved task descriptor table
#[derive(Debug, Clone)]
pub struct TaskPolicies {
    known: HashMap<TaskType, TaskDescriptorConfig>,
    fallback: TaskDescriptorConfig,
}

impl TaskPolicies {
    pub fn from_config(config: &Config) -> Self {
        Self {
            known: TaskType::KNOWN.into_iter().map(|task| (task, config.descriptor(task))).collect(),
            fallback: config.task_defaults.clone(),
        }
    }

    /// Override the policy of a known task type
    #[must_use]
    pub fn with_policy(mut self, task: TaskType, policy: TaskDescriptorConfig) -> Self {
        if task.is_recognized() {
            self.known.insert(task, policy);
        } else {
            self.fallback = policy;
        }
        self
    }

    /// Policy for `task`; unrecognized tasks get the conservative fallback
    pub fn get(&self, task: TaskType) -> &TaskDescriptorConfig {
        self.known.get(&task).unwrap_or(&self.fallback)
    }
}

impl Default for TaskPolicies {
    fn default() -> Self {
        Self {
            known: TaskType::KNOWN
                .into_iter()
                .map(|task| (task, TaskDescriptorConfig::builtin(task)))
                .collect(),
            fallback: TaskDescriptorConfig::conservative(),
        }
    }
}
