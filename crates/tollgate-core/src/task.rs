use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// AI-backed operation requested by a feature
///
/// The set is closed. Labels arriving at runtime go through
/// [`TaskType::classify`], which maps anything unknown onto
/// [`TaskType::Unrecognized`] so the caller always gets a policy.
/// Configuration goes through the strict [`FromStr`] parser instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskType {
    /// Full day-by-day trip plan
    ItineraryGeneration,
    /// Conversational reply from the trip assistant
    AssistantReply,
    /// Summary of where a group poll is converging
    ConsensusAnalysis,
    /// Candidate options for a new group poll
    PollSuggestion,
    /// Re-plan after a disruption (cancelled flight, closure)
    EmergencyReplanning,
    /// Fallback branch for labels outside the known set
    Unrecognized,
}

/// Label did not name a known task type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown task type: {0}")]
pub struct UnknownTaskType(pub String);

impl TaskType {
    /// Every recognized task type
    pub const KNOWN: [Self; 5] = [
        Self::ItineraryGeneration,
        Self::AssistantReply,
        Self::ConsensusAnalysis,
        Self::PollSuggestion,
        Self::EmergencyReplanning,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ItineraryGeneration => "itinerary_generation",
            Self::AssistantReply => "assistant_reply",
            Self::ConsensusAnalysis => "consensus_analysis",
            Self::PollSuggestion => "poll_suggestion",
            Self::EmergencyReplanning => "emergency_replanning",
            Self::Unrecognized => "unrecognized",
        }
    }

    pub const fn is_recognized(self) -> bool {
        !matches!(self, Self::Unrecognized)
    }

    /// Map a runtime label onto a task type, never failing
    pub fn classify(label: &str) -> Self {
        label.parse().unwrap_or(Self::Unrecognized)
    }
}

impl FromStr for TaskType {
    type Err = UnknownTaskType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");

        Self::KNOWN
            .into_iter()
            .find(|task| task.as_str() == normalized)
            .ok_or_else(|| UnknownTaskType(s.to_owned()))
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TaskType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TaskType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(serde::de::Error::custom)
    }
}
