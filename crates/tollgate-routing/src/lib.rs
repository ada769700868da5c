//! Model tier selection for governed calls
//!
//! The router consults the response cache, reserves budget, calls the
//! cheap tier, applies the quality gate and, for critical task types
//! only, escalates to the expensive tier.

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod backend;
mod error;
mod openai;
mod pricing;
mod quality;
mod router;
mod tasks;

pub use backend::{BackendError, Generation, ModelBackend};
pub use error::{RoutingError, UnavailableCause};
pub use openai::OpenAiBackend;
pub use pricing::{Pricing, TierPricing, count_tokens};
pub use quality::{QualityFailure, QualityGate};
pub use router::{ModelRouter, Routed};
pub use tasks::TaskPolicies;
