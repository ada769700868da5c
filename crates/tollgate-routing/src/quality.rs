use regex::{Regex, RegexBuilder};
use tollgate_config::QualityConfig;

/// Base confidence of a non-empty response
const BASE_CONFIDENCE: f64 = 0.7;
/// Deducted per hedging phrase found
const HEDGING_PENALTY: f64 = 0.15;
/// Deducted when a long prompt gets a very short answer
const TERSE_PENALTY: f64 = 0.3;
const LONG_PROMPT_TOKENS: u32 = 500;
const TERSE_RESPONSE_WORDS: usize = 20;

/// Why a response was rejected
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QualityFailure {
    #[error("response is empty")]
    Empty,
    #[error("response has {chars} characters, at least {min} required")]
    TooShort { chars: usize, min: usize },
    #[error("response matches failure marker `{0}`")]
    FailureMarker(String),
    #[error("confidence {score:.2} below {min:.2}")]
    LowConfidence { score: f64, min: f64 },
}

/// Heuristic acceptance check for generated text
#[derive(Debug, Clone)]
pub struct QualityGate {
    failure_markers: Vec<Regex>,
    hedging_phrases: Vec<String>,
    min_confidence: f64,
}

impl QualityGate {
    pub fn from_config(config: &QualityConfig) -> Result<Self, regex::Error> {
        let failure_markers = config
            .failure_markers
            .iter()
            .map(|pattern| RegexBuilder::new(pattern).case_insensitive(true).build())
            .collect::<Result<_, _>>()?;

        Ok(Self {
            failure_markers,
            hedging_phrases: config.hedging_phrases.iter().map(|p| p.to_lowercase()).collect(),
            min_confidence: config.min_confidence,
        })
    }

    /// Check a response against the gate
    ///
    /// `min_chars` comes from the task descriptor; `prompt_tokens` scales
    /// the expectation of how long the answer should be.
    pub fn check(&self, text: &str, min_chars: usize, prompt_tokens: u32) -> Result<(), QualityFailure> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(QualityFailure::Empty);
        }

        let chars = trimmed.chars().count();
        if chars < min_chars {
            return Err(QualityFailure::TooShort { chars, min: min_chars });
        }

        if let Some(marker) = self.failure_markers.iter().find(|re| re.is_match(trimmed)) {
            return Err(QualityFailure::FailureMarker(marker.as_str().to_owned()));
        }

        let score = self.confidence(trimmed, prompt_tokens);
        if score < self.min_confidence {
            return Err(QualityFailure::LowConfidence {
                score,
                min: self.min_confidence,
            });
        }

        Ok(())
    }

    /// Confidence score in `[0, 1]`
    pub fn confidence(&self, text: &str, prompt_tokens: u32) -> f64 {
        if text.trim().is_empty() {
            return 0.0;
        }

        let mut score = BASE_CONFIDENCE;

        if prompt_tokens > LONG_PROMPT_TOKENS && text.split_whitespace().count() < TERSE_RESPONSE_WORDS {
            score -= TERSE_PENALTY;
        }

        let lower = text.to_lowercase();
        for phrase in &self.hedging_phrases {
            if lower.contains(phrase.as_str()) {
                score -= HEDGING_PENALTY;
            }
        }

        score.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> QualityGate {
        QualityGate::from_config(&QualityConfig::default()).unwrap()
    }

    #[test]
    fn accepts_a_plain_answer() {
        let text = "Day one: arrive in Lisbon, walk Alfama, dinner at a tasca in Bairro Alto.";
        assert_eq!(gate().check(text, 20, 40), Ok(()));
    }

    #[test]
    fn rejects_empty_and_short() {
        let gate = gate();
        assert_eq!(gate.check("   \n", 1, 10), Err(QualityFailure::Empty));
        assert_eq!(
            gate.check("Sure.", 20, 10),
            Err(QualityFailure::TooShort { chars: 5, min: 20 })
        );
    }

    #[test]
    fn failure_markers_are_case_insensitive() {
        let err = gate()
            .check("As an AI language model, I have no opinion on restaurants.", 1, 10)
            .unwrap_err();
        assert!(matches!(err, QualityFailure::FailureMarker(_)));

        let err = gate().check("  NULL ", 1, 10).unwrap_err();
        assert!(matches!(err, QualityFailure::FailureMarker(_)));
    }

    #[test]
    fn hedging_lowers_confidence() {
        let gate = gate();
        let confident = gate.confidence("Most of the group prefers the beach option.", 30);
        let hedged = gate.confidence("I'm not sure, perhaps the beach, hard to say.", 30);
        assert!(hedged < confident);

        let err = gate
            .check("I'm not sure, perhaps the beach, hard to say.", 1, 30)
            .unwrap_err();
        assert!(matches!(err, QualityFailure::LowConfidence { .. }));
    }

    #[test]
    fn terse_answer_to_long_prompt_is_penalized() {
        let gate = gate();
        assert!(gate.confidence("Go to Rome.", 2_000) < gate.confidence("Go to Rome.", 50));
    }

    #[test]
    fn invalid_marker_fails_construction() {
        let config = QualityConfig {
            failure_markers: vec!["(unclosed".to_owned()],
            ..QualityConfig::default()
        };
        assert!(QualityGate::from_config(&config).is_err());
    }
}
