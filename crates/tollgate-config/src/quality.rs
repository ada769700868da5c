use serde::Deserialize;

/// Quality gate heuristics applied to cheap-tier output
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QualityConfig {
    /// Case-insensitive regexes that fail a response outright
    #[serde(default = "default_failure_markers")]
    pub failure_markers: Vec<String>,
    /// Phrases that lower the confidence score of a response
    #[serde(default = "default_hedging_phrases")]
    pub hedging_phrases: Vec<String>,
    /// Minimum confidence (0.0 to 1.0) for a response to pass
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            failure_markers: default_failure_markers(),
            hedging_phrases: default_hedging_phrases(),
            min_confidence: default_min_confidence(),
        }
    }
}

fn default_failure_markers() -> Vec<String> {
    [
        r"as an ai( language)? model",
        r"\bi (cannot|can't|am unable to) (help|assist|comply)",
        r"^\s*(error|undefined|null)\s*$",
        r"lorem ipsum",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
}

fn default_hedging_phrases() -> Vec<String> {
    [
        "i'm not sure",
        "i am not sure",
        "i don't know",
        "it's unclear",
        "it depends",
        "hard to say",
        "i cannot be certain",
        "possibly",
        "perhaps",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
}

const fn default_min_confidence() -> f64 {
    0.5
}
