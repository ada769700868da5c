use std::{
    collections::VecDeque,
    fmt,
    sync::{Arc, Mutex},
    time::Duration,
};

use jiff::{SignedDuration, Timestamp};
use serde::Serialize;
use tollgate_core::{Clock, Cost, ModelTier, TaskType};
use uuid::Uuid;

/// Record of one completed model invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageEvent {
    pub id: Uuid,
    pub task_type: TaskType,
    pub tier: ModelTier,
    pub model: String,
    pub user_id: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    /// Measured cost of the call
    pub cost: Cost,
    pub timestamp: Timestamp,
}

/// Aggregate over a slice of the usage log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UsageSummary {
    pub requests: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub spend_by_tier: TierSpend,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierSpend {
    pub cheap: Cost,
    pub expensive: Cost,
}

impl TierSpend {
    pub fn total(&self) -> Cost {
        self.cheap + self.expensive
    }
}

/// Append-only usage event log with bounded retention
///
/// Events older than the retention period are pruned whenever the log
/// is appended to or read.
#[derive(Clone)]
pub struct UsageLog {
    events: Arc<Mutex<VecDeque<UsageEvent>>>,
    retention: SignedDuration,
    clock: Arc<dyn Clock>,
}

impl UsageLog {
    pub fn new(retention: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            events: Arc::default(),
            retention: SignedDuration::try_from(retention).unwrap_or(SignedDuration::MAX),
            clock,
        }
    }

    /// Append a usage event stamped with the current time
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        &self,
        task_type: TaskType,
        tier: ModelTier,
        model: &str,
        user_id: &str,
        input_tokens: u32,
        output_tokens: u32,
        cost: Cost,
    ) -> UsageEvent {
        let event = UsageEvent {
            id: Uuid::new_v4(),
            task_type,
            tier,
            model: model.to_owned(),
            user_id: user_id.to_owned(),
            input_tokens,
            output_tokens,
            cost,
            timestamp: self.clock.now(),
        };

        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        self.prune(&mut events);
        events.push_back(event.clone());

        tracing::debug!(
            event_id = %event.id,
            task_type = %event.task_type,
            tier = %event.tier,
            user_id = %event.user_id,
            cost = %event.cost,
            "usage event recorded"
        );

        event
    }

    /// Events retained for a user (or for everyone), oldest first
    pub fn events(&self, user_id: Option<&str>) -> Vec<UsageEvent> {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        self.prune(&mut events);

        events
            .iter()
            .filter(|event| user_id.is_none_or(|id| event.user_id == id))
            .cloned()
            .collect()
    }

    /// Aggregate events at or after `since`, optionally for one user
    pub fn summary(&self, since: Option<Timestamp>, user_id: Option<&str>) -> UsageSummary {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        self.prune(&mut events);

        events
            .iter()
            .filter(|event| since.is_none_or(|since| event.timestamp >= since))
            .filter(|event| user_id.is_none_or(|id| event.user_id == id))
            .fold(UsageSummary::default(), |mut summary, event| {
                summary.requests += 1;
                summary.input_tokens += u64::from(event.input_tokens);
                summary.output_tokens += u64::from(event.output_tokens);
                match event.tier {
                    ModelTier::Cheap => summary.spend_by_tier.cheap += event.cost,
                    ModelTier::Expensive => summary.spend_by_tier.expensive += event.cost,
                }
                summary
            })
    }

    pub fn len(&self) -> usize {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        self.prune(&mut events);
        events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn prune(&self, events: &mut VecDeque<UsageEvent>) {
        let Ok(cutoff) = self.clock.now().checked_sub(self.retention) else {
            return;
        };

        while events.front().is_some_and(|event| event.timestamp < cutoff) {
            events.pop_front();
        }
    }
}

impl fmt::Debug for UsageLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsageLog")
            .field("retention", &self.retention)
            .finish_non_exhaustive()
    }
}
