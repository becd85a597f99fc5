//! SiteGate Storage - Access Store, Subscription Cache and Resolver
//!
//! The access store is the durable source of truth and lives outside this
//! workspace; [`AccessStore`] is its boundary. On top of it sit the two
//! read-mostly components every request goes through:
//!
//! - [`SubscriptionCache`]: per-tenant TTL cache of subscription decisions
//! - [`AccessResolver`]: role/resource decisions over the stored matrix
//!
//! Both absorb store failures into conservative answers instead of
//! returning errors, but with different policies: the cache denies, the
//! resolver keeps admin access.

pub mod access;
pub mod cache;
pub mod memory;
pub mod store;

pub use access::AccessResolver;
pub use cache::{CacheConfig, CacheStats, SubscriptionCache, SubscriptionStatusSource};
pub use memory::{InMemoryAccessStore, StoreSeed};
pub use store::{bounded, AccessStore, StoreResult};
