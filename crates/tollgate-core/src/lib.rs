//! Shared types for the tollgate governance layer
//!
//! Task types, model tiers, budget scopes, the fixed-point [`Cost`] used
//! for every budget computation, and the [`Clock`] seam shared by every
//! component that reasons about time.

#![allow(clippy::must_use_candidate)]

mod clock;
mod cost;
mod error;
mod scope;
mod task;
mod tier;

pub use clock::{Clock, ManualClock, SystemClock};
pub use cost::Cost;
pub use error::HttpError;
pub use scope::BudgetScope;
pub use task::{TaskType, UnknownTaskType};
pub use tier::ModelTier;
