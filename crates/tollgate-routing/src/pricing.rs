use std::sync::LazyLock;

use tiktoken_rs::{CoreBPE, o200k_base};
use tollgate_config::{ModelsConfig, TierModelConfig};
use tollgate_core::{Cost, ModelTier};

static TOKENIZER: LazyLock<Option<CoreBPE>> = LazyLock::new(|| o200k_base().ok());

/// Count tokens with the o200k encoding, or approximate at four bytes
/// per token when the encoding is unavailable
pub fn count_tokens(text: &str) -> u32 {
    let tokens = TOKENIZER
        .as_ref()
        .map_or_else(|| text.len() / 4, |bpe| bpe.encode_with_special_tokens(text).len());
    u32::try_from(tokens).unwrap_or(u32::MAX)
}

/// Per-million-token prices of one tier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierPricing {
    pub input_per_mtok: f64,
    pub output_per_mtok: f64,
}

impl From<&TierModelConfig> for TierPricing {
    fn from(config: &TierModelConfig) -> Self {
        Self {
            input_per_mtok: config.input_per_mtok,
            output_per_mtok: config.output_per_mtok,
        }
    }
}

impl TierPricing {
    pub fn cost(&self, input_tokens: u32, output_tokens: u32) -> Cost {
        let input = f64::from(input_tokens) / 1_000_000.0 * self.input_per_mtok;
        let output = f64::from(output_tokens) / 1_000_000.0 * self.output_per_mtok;
        Cost::from_usd(input + output)
    }
}

/// Token-to-currency conversion for both tiers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    cheap: TierPricing,
    expensive: TierPricing,
}

impl Pricing {
    pub const fn new(cheap: TierPricing, expensive: TierPricing) -> Self {
        Self { cheap, expensive }
    }

    pub fn from_config(config: &ModelsConfig) -> Self {
        Self::new((&config.cheap).into(), (&config.expensive).into())
    }

    pub const fn tier(&self, tier: ModelTier) -> &TierPricing {
        match tier {
            ModelTier::Cheap => &self.cheap,
            ModelTier::Expensive => &self.expensive,
        }
    }

    /// Measured cost of a finished call
    pub fn cost(&self, tier: ModelTier, input_tokens: u32, output_tokens: u32) -> Cost {
        self.tier(tier).cost(input_tokens, output_tokens)
    }

    /// Worst-case cost of a call: the prompt plus a full `token_ceiling`
    /// of output
    pub fn estimate(&self, tier: ModelTier, prompt: &str, token_ceiling: u32) -> Cost {
        self.cost(tier, count_tokens(prompt), token_ceiling)
    }
}
