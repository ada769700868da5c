use std::fmt;

use secrecy::SecretString;
use serde::Deserialize;
use tollgate_core::ModelTier;
use url::Url;

/// Remote model backend shared by both tiers
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelsConfig {
    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_base_url")]
    pub base_url: Url,
    #[serde(default)]
    pub api_key: Option<SecretString>,
    pub cheap: TierModelConfig,
    pub expensive: TierModelConfig,
}

impl ModelsConfig {
    pub const fn tier(&self, tier: ModelTier) -> &TierModelConfig {
        match tier {
            ModelTier::Cheap => &self.cheap,
            ModelTier::Expensive => &self.expensive,
        }
    }
}

impl fmt::Debug for ModelsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelsConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("cheap", &self.cheap)
            .field("expensive", &self.expensive)
            .finish()
    }
}

/// Model name and pricing for one tier
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TierModelConfig {
    pub model: String,
    /// USD per million input tokens
    pub input_per_mtok: f64,
    /// USD per million output tokens
    pub output_per_mtok: f64,
}

fn default_base_url() -> Url {
    Url::parse("https://api.openai.com/v1").expect("default base url must parse")
}
