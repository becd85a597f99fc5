//! Subscription status caching.
//!
//! # Design
//!
//! - One entry per tenant, keyed by [`TenantId`](sitegate_core::TenantId)
//! - Expiry is lazy: an expired entry is a miss and is removed when seen
//! - Expired entries are also swept opportunistically, and the size bound
//!   is enforced on every insert
//! - Store failures produce a conservative deny which is never stored
//! - Explicit invalidation beats any lookup for the same tenant that was in
//!   flight when it ran

mod config;
mod entry;
mod subscription;
mod traits;

pub use config::{CacheConfig, MAX_TTL};
pub use subscription::SubscriptionCache;
pub use traits::{CacheStats, SubscriptionStatusSource};
