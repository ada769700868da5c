//! Programmatic configuration builder for integration tests

use std::net::SocketAddr;
use std::time::Duration;

use indexmap::IndexMap;
use secrecy::SecretString;
use tollgate_config::{
    BudgetConfig, CacheConfig, Config, HealthConfig, ModelsConfig, QualityConfig, RateLimitConfig, RequestRateLimit,
    ServerConfig, TaskDescriptorConfig, TierModelConfig,
};
use tollgate_core::{Cost, TaskType};

use super::mock_model::{CHEAP_MODEL, EXPENSIVE_MODEL};

/// Builder for constructing test configurations
///
/// Prompt tokens are free and completion tokens cost 10 (cheap) or 50
/// (expensive) per million, so costs are exact multiples of the
/// completion tokens the mock reports.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new(base_url: &str) -> Self {
        Self {
            config: Config {
                server: ServerConfig {
                    listen_address: Some(SocketAddr::from(([127, 0, 0, 1], 0))),
                    health: HealthConfig {
                        enabled: true,
                        ..HealthConfig::default()
                    },
                    ..ServerConfig::default()
                },
                budget: BudgetConfig::default(),
                models: ModelsConfig {
                    base_url: base_url.parse().expect("valid URL"),
                    api_key: Some(SecretString::from("test-key")),
                    cheap: TierModelConfig {
                        model: CHEAP_MODEL.to_owned(),
                        input_per_mtok: 0.0,
                        output_per_mtok: 10.0,
                    },
                    expensive: TierModelConfig {
                        model: EXPENSIVE_MODEL.to_owned(),
                        input_per_mtok: 0.0,
                        output_per_mtok: 50.0,
                    },
                },
                tasks: IndexMap::new(),
                task_defaults: TaskDescriptorConfig::conservative(),
                quality: QualityConfig::default(),
                cache: CacheConfig::default(),
                rate_limit: None,
                telemetry: None,
            },
        }
    }

    pub fn with_user_limit(mut self, usd: f64) -> Self {
        self.config.budget.user_daily.limit = Cost::from_usd(usd);
        self
    }

    pub fn with_system_limit(mut self, usd: f64) -> Self {
        self.config.budget.system_daily.limit = Cost::from_usd(usd);
        self
    }

    pub fn with_task(mut self, task: TaskType, descriptor: TaskDescriptorConfig) -> Self {
        self.config.tasks.insert(task, descriptor);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.server.request_timeout = timeout;
        self
    }

    pub fn with_global_rate_limit(mut self, requests: u32, window: Duration) -> Self {
        self.rate_limit().global = Some(RequestRateLimit { requests, window });
        self
    }

    pub fn with_user_rate_limit(mut self, requests: u32, window: Duration) -> Self {
        self.rate_limit().per_user = Some(RequestRateLimit { requests, window });
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.config.cache.enabled = false;
        self
    }

    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    pub fn build(self) -> Config {
        self.config.validate().expect("test config is valid");
        self.config
    }

    fn rate_limit(&mut self) -> &mut RateLimitConfig {
        self.config.rate_limit.get_or_insert_with(RateLimitConfig::default)
    }
}
