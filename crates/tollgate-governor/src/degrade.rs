use serde::Serialize;
use thiserror::Error;
use tollgate_core::{BudgetScope, TaskType};
use tollgate_ledger::BudgetExceeded;
use tollgate_ratelimit::LimitKind;
use tollgate_routing::{RoutingError, UnavailableCause};

/// How the calling feature should adjust its behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackAction {
    /// Keep the feature, without AI-generated content
    BasicMode,
    /// Let the user do the task by hand
    ManualMode,
}

impl FallbackAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BasicMode => "basic_mode",
            Self::ManualMode => "manual_mode",
        }
    }
}

/// User-facing replacement for a generated response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Degradation {
    pub message: String,
    pub suggestions: Vec<String>,
    pub fallback_action: FallbackAction,
}

/// Why a governed call was degraded
#[derive(Debug, Error)]
pub enum GovernFailure {
    #[error(transparent)]
    BudgetExceeded(#[from] BudgetExceeded),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(UnavailableCause),

    #[error("rate limited by {kind:?} limit, retry after {retry_after}s")]
    RateLimited { kind: LimitKind, retry_after: u64 },
}

impl GovernFailure {
    /// Stable label for logs and metrics
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::BudgetExceeded(_) => "budget_exceeded",
            Self::ServiceUnavailable(_) => "service_unavailable",
            Self::RateLimited { .. } => "rate_limited",
        }
    }
}

impl From<RoutingError> for GovernFailure {
    fn from(error: RoutingError) -> Self {
        match error {
            RoutingError::BudgetExceeded(exceeded) => Self::BudgetExceeded(exceeded),
            RoutingError::ServiceUnavailable { cause } => Self::ServiceUnavailable(cause),
        }
    }
}

/// Non-AI fallback suggestions for a task type
pub const fn suggestions(task: TaskType) -> &'static [&'static str] {
    match task {
        TaskType::ItineraryGeneration => &[
            "Start from one of the saved itinerary templates",
            "Add activities by hand from the places list",
            "Ask the group to vote on must-see spots",
        ],
        TaskType::AssistantReply => &[
            "Check the shared trip notes",
            "Browse the trip FAQ",
            "Message your group directly",
        ],
        TaskType::ConsensusAnalysis => &[
            "Review the poll results table",
            "Sort the options by vote count",
            "Ask the group to confirm the leading option",
        ],
        TaskType::PollSuggestion => &[
            "Create the poll with your own options",
            "Reuse options from an earlier poll",
            "Invite members to add options",
        ],
        TaskType::EmergencyReplanning => &[
            "Contact the airline or operator directly",
            "Open the emergency contacts in the trip details",
            "Post a status update to your group",
        ],
        TaskType::Unrecognized => &["Continue without AI assistance", "Try again later"],
    }
}

/// Build the degraded response for a failed call
///
/// Never calls a model and never touches the ledger. Budget amounts and
/// scope names stay out of the message.
pub fn degrade(task: TaskType, failure: &GovernFailure) -> Degradation {
    let (message, fallback_action) = match failure {
        GovernFailure::BudgetExceeded(exceeded) => (budget_message(exceeded.scope), FallbackAction::BasicMode),
        GovernFailure::ServiceUnavailable(_) => (
            "AI assistance is unavailable right now. You can carry on manually and try again later.".to_owned(),
            FallbackAction::ManualMode,
        ),
        GovernFailure::RateLimited { retry_after, .. } => (
            format!("You're sending requests too quickly. Try again in {retry_after} seconds."),
            FallbackAction::BasicMode,
        ),
    };

    Degradation {
        message,
        suggestions: suggestions(task).iter().map(|s| (*s).to_owned()).collect(),
        fallback_action,
    }
}

fn budget_message(scope: BudgetScope) -> String {
    match scope {
        BudgetScope::Request => "This request is too large for AI assistance. Try a shorter or simpler request.",
        BudgetScope::UserDaily => {
            "You've reached today's AI usage allowance. AI features will be back after the daily reset."
        }
        BudgetScope::SystemDaily => {
            "AI features are paused for everyone until tomorrow. Everything else keeps working as usual."
        }
    }
    .to_owned()
}
