//! Budget ledger and usage event log
//!
//! The ledger is the only owner of spend counters. Every model call is
//! preceded by a [`Reservation`] across the request, user and system
//! scopes and followed by a commit (actual cost) or a release.

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod counter;
mod error;
mod ledger;
mod usage;
mod window;

pub use error::BudgetExceeded;
pub use ledger::{BudgetLedger, RequestScope, Reservation, ScopeKey, ScopeLimit, ScopeSnapshot, Settlement};
pub use usage::{TierSpend, UsageEvent, UsageLog, UsageSummary};
pub use window::Window;
