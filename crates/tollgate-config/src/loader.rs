use std::{path::Path, time::Duration};

use tollgate_core::{Cost, ModelTier};

use crate::{Config, RequestRateLimit, TaskDescriptorConfig};

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml_str(&raw)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Reject configurations the governor cannot enforce
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_budget()?;
        self.validate_models()?;
        self.validate_tasks()?;
        self.validate_quality()?;
        self.validate_rate_limits()?;

        if self.server.request_timeout.is_zero() {
            anyhow::bail!("server.request_timeout must be greater than zero");
        }

        Ok(())
    }

    fn validate_budget(&self) -> anyhow::Result<()> {
        let budget = &self.budget;

        if budget.reset_hour_utc > 23 {
            anyhow::bail!("budget.reset_hour_utc must be between 0 and 23, got {}", budget.reset_hour_utc);
        }

        let limits = [
            ("request", budget.request.limit),
            ("user_daily", budget.user_daily.limit),
            ("system_daily", budget.system_daily.limit),
        ];

        for (scope, limit) in limits {
            if limit == Cost::ZERO {
                anyhow::bail!("budget.{scope}.limit must be greater than zero");
            }
        }

        for (scope, window) in [
            ("user_daily", budget.user_daily.window),
            ("system_daily", budget.system_daily.window),
        ] {
            if window.is_zero() {
                anyhow::bail!("budget.{scope}.window must be greater than zero");
            }
        }

        let longest_window = budget.user_daily.window.max(budget.system_daily.window);
        if budget.usage_retention < longest_window {
            anyhow::bail!(
                "budget.usage_retention ({:?}) must cover the longest budget window ({:?})",
                budget.usage_retention,
                longest_window
            );
        }

        let thresholds = budget.thresholds;
        if !(thresholds.warning > 0.0 && thresholds.warning <= thresholds.critical && thresholds.critical <= 1.0) {
            anyhow::bail!(
                "budget.thresholds must satisfy 0 < warning <= critical <= 1, got warning={} critical={}",
                thresholds.warning,
                thresholds.critical
            );
        }

        if budget.request.limit > budget.user_daily.limit {
            tracing::warn!(
                request_limit = %budget.request.limit,
                user_daily_limit = %budget.user_daily.limit,
                "request limit exceeds the user daily limit"
            );
        }

        Ok(())
    }

    fn validate_models(&self) -> anyhow::Result<()> {
        for tier in [ModelTier::Cheap, ModelTier::Expensive] {
            let model = self.models.tier(tier);

            if model.model.trim().is_empty() {
                anyhow::bail!("models.{tier}.model must not be empty");
            }

            for (field, price) in [
                ("input_per_mtok", model.input_per_mtok),
                ("output_per_mtok", model.output_per_mtok),
            ] {
                if !price.is_finite() || price < 0.0 {
                    anyhow::bail!("models.{tier}.{field} must be a non-negative number, got {price}");
                }
            }
        }

        if self.models.expensive.output_per_mtok < self.models.cheap.output_per_mtok {
            tracing::warn!(
                cheap = %self.models.cheap.model,
                expensive = %self.models.expensive.model,
                "expensive tier is priced below the cheap tier"
            );
        }

        Ok(())
    }

    fn validate_tasks(&self) -> anyhow::Result<()> {
        let entries = self
            .tasks
            .iter()
            .map(|(task, descriptor)| (task.as_str(), descriptor))
            .chain(std::iter::once(("task_defaults", &self.task_defaults)));

        for (label, descriptor) in entries {
            validate_descriptor(label, descriptor)?;
        }

        if self.task_defaults.critical {
            tracing::warn!("task_defaults.critical is set; unrecognized task types may reach the expensive tier");
        }

        Ok(())
    }

    fn validate_quality(&self) -> anyhow::Result<()> {
        for pattern in &self.quality.failure_markers {
            regex::RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| anyhow::anyhow!("invalid quality.failure_markers pattern '{pattern}': {e}"))?;
        }

        let min = self.quality.min_confidence;
        if !(0.0..=1.0).contains(&min) {
            anyhow::bail!("quality.min_confidence must be between 0.0 and 1.0, got {min}");
        }

        Ok(())
    }

    fn validate_rate_limits(&self) -> anyhow::Result<()> {
        let Some(rate_limit) = &self.rate_limit else {
            return Ok(());
        };

        let named = [("global", rate_limit.global), ("per_user", rate_limit.per_user)]
            .into_iter()
            .filter_map(|(name, limit)| limit.map(|l| (name.to_owned(), l)))
            .chain(
                rate_limit
                    .tasks
                    .iter()
                    .map(|(task, limit)| (format!("tasks.{task}"), *limit)),
            );

        for (name, limit) in named {
            validate_rate_limit(&name, limit)?;
        }

        Ok(())
    }
}

fn validate_descriptor(label: &str, descriptor: &TaskDescriptorConfig) -> anyhow::Result<()> {
    if descriptor.token_ceiling == 0 {
        anyhow::bail!("{label}: token_ceiling must be greater than zero");
    }

    if descriptor.timeout.is_zero() {
        anyhow::bail!("{label}: timeout must be greater than zero");
    }

    Ok(())
}

fn validate_rate_limit(name: &str, limit: RequestRateLimit) -> anyhow::Result<()> {
    if limit.requests == 0 {
        anyhow::bail!("rate_limit.{name}.requests must be greater than zero");
    }

    if limit.window < Duration::from_millis(1) {
        anyhow::bail!("rate_limit.{name}.window must be at least 1ms");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tollgate_core::{Cost, TaskType};

    use crate::{CacheBackendConfig, Config, RateLimitStorage, TaskDescriptorConfig};

    const MODELS: &str = r#"
[models]
base_url = "http://127.0.0.1:9999/v1"

[models.cheap]
model = "small"
input_per_mtok = 0.15
output_per_mtok = 0.60

[models.expensive]
model = "large"
input_per_mtok = 2.50
output_per_mtok = 10.00
"#;

    fn parse(extra: &str) -> anyhow::Result<Config> {
        Config::from_toml_str(&format!("{MODELS}\n{extra}"))
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = parse("").unwrap();

        assert_eq!(config.budget.reset_hour_utc, 0);
        assert_eq!(config.budget.user_daily.limit, Cost::from_micros(500_000));
        assert_eq!(config.budget.user_daily.window, Duration::from_secs(86_400));
        assert_eq!(config.server.request_timeout, Duration::from_secs(120));
        assert!(config.server.health.enabled);
        assert!(config.cache.enabled);
        assert!(matches!(config.cache.backend, CacheBackendConfig::Memory { max_entries: 10_000 }));
        assert!(config.rate_limit.is_none());
        assert!(config.models.api_key.is_none());
    }

    #[test]
    fn full_config_parses() {
        let config = parse(
            r#"
[server]
listen_address = "127.0.0.1:8080"
request_timeout = "30s"

[budget]
reset_hour_utc = 4
usage_retention = "2d"
request = { limit = 0.10 }
user_daily = { limit = 0.50, window = "1d" }
system_daily = { limit = 25.0 }
thresholds = { warning = 0.7, critical = 0.9 }

[tasks.consensus_analysis]
token_ceiling = 300
cache_ttl = "5m"
min_response_chars = 50

[task_defaults]
token_ceiling = 128
cache_ttl = "0s"

[cache]
operation_timeout = "100ms"
backend = { type = "valkey", url = "redis://localhost:6379" }

[rate_limit]
storage = { type = "redis", url = "redis://localhost:6379" }
per_user = { requests = 30, window = "1m" }
tasks.itinerary_generation = { requests = 5, window = "1h" }
"#,
        )
        .unwrap();

        assert_eq!(config.budget.reset_hour_utc, 4);
        assert_eq!(config.budget.request.limit, Cost::from_micros(100_000));
        assert_eq!(config.budget.system_daily.limit, Cost::from_micros(25_000_000));
        assert_eq!(config.budget.usage_retention, Duration::from_secs(2 * 86_400));

        let consensus = config.descriptor(TaskType::ConsensusAnalysis);
        assert_eq!(consensus.token_ceiling, 300);
        assert_eq!(consensus.cache_ttl, Duration::from_secs(300));
        assert_eq!(consensus.min_response_chars, 50);
        assert!(!consensus.critical);

        let fallback = config.descriptor(TaskType::Unrecognized);
        assert_eq!(fallback.token_ceiling, 128);
        assert!(fallback.cache_ttl.is_zero());

        assert!(matches!(config.cache.backend, CacheBackendConfig::Valkey { .. }));

        let rate_limit = config.rate_limit.unwrap();
        assert!(matches!(rate_limit.storage, RateLimitStorage::Redis { .. }));
        assert_eq!(rate_limit.per_user.unwrap().requests, 30);
        assert_eq!(rate_limit.tasks[&TaskType::ItineraryGeneration].window, Duration::from_secs(3600));
    }

    #[test]
    fn unconfigured_known_tasks_use_builtin_table() {
        let config = parse("").unwrap();

        let emergency = config.descriptor(TaskType::EmergencyReplanning);
        assert_eq!(emergency, TaskDescriptorConfig::builtin(TaskType::EmergencyReplanning));
        assert!(emergency.critical);
        assert!(!config.descriptor(TaskType::ConsensusAnalysis).critical);
        assert_eq!(config.descriptor(TaskType::Unrecognized), TaskDescriptorConfig::conservative());
    }

    #[test]
    fn zero_limit_is_rejected() {
        let err = parse("[budget]\nuser_daily = { limit = 0.0 }").unwrap_err();
        assert!(err.to_string().contains("user_daily.limit"));
    }

    #[test]
    fn negative_limit_is_rejected() {
        let err = parse("[budget]\nsystem_daily = { limit = -1.0 }").unwrap_err();
        assert!(err.to_string().contains("failed to parse config"));
    }

    #[test]
    fn reset_hour_out_of_range_is_rejected() {
        let err = parse("[budget]\nreset_hour_utc = 24").unwrap_err();
        assert!(err.to_string().contains("reset_hour_utc"));
    }

    #[test]
    fn retention_shorter_than_window_is_rejected() {
        let err = parse("[budget]\nusage_retention = \"1h\"\nuser_daily = { limit = 0.5, window = \"1d\" }").unwrap_err();
        assert!(err.to_string().contains("usage_retention"));

        assert!(parse("[budget]\nusage_retention = \"1d\"\nuser_daily = { limit = 0.5, window = \"1d\" }").is_ok());
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let err = parse("[budget]\nthresholds = { warning = 0.9, critical = 0.5 }").unwrap_err();
        assert!(err.to_string().contains("thresholds"));
    }

    #[test]
    fn unknown_task_key_is_rejected() {
        let err = parse("[tasks.translate]\ntoken_ceiling = 10\ncache_ttl = \"1m\"").unwrap_err();
        assert!(err.to_string().contains("failed to parse config"));
    }

    #[test]
    fn zero_token_ceiling_is_rejected() {
        let err = parse("[tasks.poll_suggestion]\ntoken_ceiling = 0\ncache_ttl = \"1m\"").unwrap_err();
        assert!(err.to_string().contains("token_ceiling"));
    }

    #[test]
    fn bad_duration_is_rejected() {
        let err = parse("[server]\nrequest_timeout = \"soon\"").unwrap_err();
        assert!(err.to_string().contains("invalid duration"));
    }

    #[test]
    fn negative_price_is_rejected() {
        let raw = MODELS.replace("input_per_mtok = 0.15", "input_per_mtok = -0.15");
        let err = Config::from_toml_str(&raw).unwrap_err();
        assert!(err.to_string().contains("models.cheap.input_per_mtok"));
    }

    #[test]
    fn invalid_failure_marker_is_rejected() {
        let err = parse("[quality]\nfailure_markers = [\"(unclosed\"]").unwrap_err();
        assert!(err.to_string().contains("failure_markers"));
    }

    #[test]
    fn zero_rate_limit_is_rejected() {
        let err = parse("[rate_limit]\nglobal = { requests = 0, window = \"1s\" }").unwrap_err();
        assert!(err.to_string().contains("rate_limit.global.requests"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = parse("[server]\nport = 80").unwrap_err();
        assert!(err.to_string().contains("failed to parse config"));
    }

    #[test]
    fn api_key_is_expanded_from_env() {
        let raw = MODELS.replace(
            "base_url = \"http://127.0.0.1:9999/v1\"",
            "base_url = \"http://127.0.0.1:9999/v1\"\napi_key = \"{{ env.TOLLGATE_TEST_KEY }}\"",
        );

        temp_env::with_var("TOLLGATE_TEST_KEY", Some("sk-abc"), || {
            use secrecy::ExposeSecret;

            let config = Config::from_toml_str(&raw).unwrap();
            assert_eq!(config.models.api_key.unwrap().expose_secret(), "sk-abc");
        });
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tollgate.toml");
        std::fs::write(&path, MODELS).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.models.cheap.model, "small");
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Config::load(std::path::Path::new("/nonexistent/tollgate.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/tollgate.toml"));
    }
}
