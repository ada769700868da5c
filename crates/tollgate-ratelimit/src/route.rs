use std::collections::HashMap;

use tollgate_config::{RateLimitConfig, RateLimitStorage, RequestRateLimit};
use tollgate_core::TaskType;

use crate::{
    error::RateLimitError,
    storage::{memory::MemoryLimiter, redis::RedisLimiter},
};

/// Which limit rejected a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    Global,
    User,
    Task(TaskType),
}

/// Request-count limits for the governed route
///
/// The global limit guards the process as a whole. Per-user and
/// per-task limits are checked by the interceptor for each call.
/// Storage failures let the request through.
#[derive(Debug, Default)]
pub struct RouteLimiter {
    global: Option<Limiter>,
    per_user: Option<Limiter>,
    tasks: HashMap<TaskType, Limiter>,
}

#[derive(Debug)]
enum Limiter {
    Memory(MemoryLimiter),
    Redis(RedisLimiter),
}

impl RouteLimiter {
    pub fn new(config: &RateLimitConfig) -> Result<Self, RateLimitError> {
        let build = |scope: &str, limit: &RequestRateLimit| build_limiter(&config.storage, scope, limit);

        let global = config.global.as_ref().map(|l| build("global", l)).transpose()?;
        let per_user = config.per_user.as_ref().map(|l| build("user", l)).transpose()?;
        let tasks = config
            .tasks
            .iter()
            .map(|(task, limit)| Ok((*task, build(&format!("task:{task}"), limit)?)))
            .collect::<Result<_, RateLimitError>>()?;

        Ok(Self {
            global,
            per_user,
            tasks,
        })
    }

    /// A limiter that admits everything
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub const fn has_global(&self) -> bool {
        self.global.is_some()
    }

    pub async fn check_global(&self) -> Result<(), RateLimitError> {
        match &self.global {
            Some(limiter) => check(limiter, "all", LimitKind::Global).await,
            None => Ok(()),
        }
    }

    /// Check the per-user and per-task limits for one call
    pub async fn check_call(&self, task: TaskType, user_id: &str) -> Result<(), (LimitKind, RateLimitError)> {
        if let Some(limiter) = &self.per_user {
            check(limiter, user_id, LimitKind::User)
                .await
                .map_err(|e| (LimitKind::User, e))?;
        }

        if let Some(limiter) = self.tasks.get(&task) {
            let kind = LimitKind::Task(task);
            check(limiter, user_id, kind).await.map_err(|e| (kind, e))?;
        }

        Ok(())
    }
}

fn build_limiter(storage: &RateLimitStorage, scope: &str, limit: &RequestRateLimit) -> Result<Limiter, RateLimitError> {
    match storage {
        RateLimitStorage::Memory => Ok(Limiter::Memory(MemoryLimiter::new(limit.requests, limit.window)?)),
        RateLimitStorage::Redis { url, key_prefix } => Ok(Limiter::Redis(RedisLimiter::new(
            url.as_str(),
            &format!("{key_prefix}:{scope}"),
            limit.requests,
            limit.window,
        )?)),
    }
}

async fn check(limiter: &Limiter, key: &str, kind: LimitKind) -> Result<(), RateLimitError> {
    let result = match limiter {
        Limiter::Memory(memory) => memory.check(key),
        Limiter::Redis(redis) => redis.check(key).await,
    };

    match result {
        Err(RateLimitError::Exceeded { retry_after }) => {
            tracing::debug!(key, limit = ?kind, retry_after, "rate limit exceeded");
            Err(RateLimitError::Exceeded { retry_after })
        }
        Err(e) => {
            tracing::warn!(error = %e, limit = ?kind, "rate limit storage unavailable, allowing request");
            Ok(())
        }
        Ok(()) => Ok(()),
    }
}
