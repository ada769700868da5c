//! Governance entry point for AI-backed features
//!
//! [`Governor::govern`] wraps every model call: it applies route-level
//! rate limits, runs the [`ModelRouter`](tollgate_routing::ModelRouter)
//! under a deadline and turns every failure into a [`Degradation`].
//! Features only ever see a [`Governed`] value.

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod degrade;
mod governor;
mod outcome;
mod reporter;

pub use degrade::{Degradation, FallbackAction, GovernFailure, degrade, suggestions};
pub use governor::Governor;
pub use outcome::Governed;
pub use reporter::{BudgetStatus, TierThresholds, UsageReporter, UsageStats};
