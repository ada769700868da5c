#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod error;
mod route;
pub mod storage;

pub use error::RateLimitError;
pub use route::{LimitKind, RouteLimiter};
