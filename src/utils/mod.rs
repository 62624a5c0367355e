//! Utility modules: request rate limiting, the response cache, and PMID
//! helpers.

pub mod cache;
pub mod pmid;
pub mod rate_limit;

pub use cache::{CacheManager, CacheStats, KeyBuilder};
pub use pmid::{extract_pmids, validate_pmid};
pub use rate_limit::RateLimiter;
