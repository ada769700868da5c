//! Content-addressed cache of generated responses
//!
//! Keys are SHA-256 fingerprints of the task type and the normalized
//! prompt. The cache is an optimization only: backend failures and slow
//! lookups are reported as misses and never surface to callers.

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod backend;
mod cache;
mod entry;
mod fingerprint;
mod memory;
mod valkey;

pub use backend::{CacheBackend, CacheError};
pub use cache::ResponseCache;
pub use entry::CacheEntry;
pub use fingerprint::{CacheKey, fingerprint};
pub use memory::MemoryBackend;
pub use valkey::ValkeyBackend;
