//! On-disk LLM response cache: one JSON file per (model, prompt) pair with
//! TTL-based invalidation.

pub mod key;
pub mod store;

pub use key::CacheKey;
pub use store::{CacheEntry, CacheStore};
