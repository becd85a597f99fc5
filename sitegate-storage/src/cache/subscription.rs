//! Per-tenant subscription decision cache.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use sitegate_core::{SiteGateResult, SubscriptionDecision, TenantId};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use super::config::CacheConfig;
use super::entry::CacheEntry;
use super::traits::{CacheStats, SubscriptionStatusSource};
use crate::store::{bounded, AccessStore, StoreResult};

/// TTL cache of [`SubscriptionDecision`]s in front of an [`AccessStore`].
///
/// Lookups never fail: a store error or timeout yields
/// [`SubscriptionDecision::conservative_deny`], which is returned to the
/// caller but not stored, so the next lookup retries the store. The whole
/// store round-trip for one miss runs under a single `store_timeout`.
///
/// # Invalidation
///
/// A miss registers a ticket for its tenant before going to the store.
/// Concurrent misses for the same tenant share the ticket. The result is
/// only stored if the ticket is still registered, checked and consumed under
/// the entry's shard lock. [`invalidate`](Self::invalidate) drops the
/// tenant's ticket, so a lookup that overlaps it cannot put a
/// pre-invalidation answer back, while lookups for other tenants are
/// unaffected. [`clear_all`](Self::clear_all) drops every ticket.
pub struct SubscriptionCache {
    store: Arc<dyn AccessStore>,
    config: CacheConfig,
    entries: DashMap<TenantId, CacheEntry>,
    pending: DashMap<TenantId, u64>,
    next_ticket: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    store_failures: AtomicU64,
    evictions: AtomicU64,
}

/// Ticket held by an in-flight miss. Dropping it unregisters the ticket
/// unless it was already consumed or replaced.
struct PendingLookup<'a> {
    pending: &'a DashMap<TenantId, u64>,
    tenant_id: &'a TenantId,
    ticket: u64,
}

impl Drop for PendingLookup<'_> {
    fn drop(&mut self) {
        let ticket = self.ticket;
        self.pending.remove_if(self.tenant_id, |_, current| *current == ticket);
    }
}

impl SubscriptionCache {
    pub fn new(store: Arc<dyn AccessStore>, config: CacheConfig) -> Self {
        Self {
            store,
            config,
            entries: DashMap::new(),
            pending: DashMap::new(),
            next_ticket: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            store_failures: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Decision for `tenant_id`, from cache when live, otherwise from the
    /// store.
    pub async fn get_status(&self, tenant_id: &TenantId) -> SubscriptionDecision {
        self.maybe_sweep();

        if let Some(decision) = self.live_entry(tenant_id, Instant::now()) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(tenant_id = %tenant_id, "Subscription cache hit");
            return decision;
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let lookup = self.begin_lookup(tenant_id);
        let fetched = bounded(
            "subscription_lookup",
            self.config.store_timeout,
            self.fetch(tenant_id),
        )
        .await;

        match fetched {
            Ok(decision) => {
                self.store_entry(tenant_id, decision, lookup.ticket);
                decision
            }
            Err(err) => {
                self.store_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    tenant_id = %tenant_id,
                    error = %err,
                    "Subscription lookup failed, denying conservatively"
                );
                SubscriptionDecision::conservative_deny()
            }
        }
    }

    /// Drop the stored decision for one tenant.
    ///
    /// Returns true if an entry was removed.
    pub fn invalidate(&self, tenant_id: &TenantId) -> bool {
        self.pending.remove(tenant_id);
        let removed = self.entries.remove(tenant_id).is_some();
        info!(tenant_id = %tenant_id, removed, "Invalidated subscription cache entry");
        removed
    }

    /// Drop every stored decision. Returns the number removed.
    pub fn clear_all(&self) -> usize {
        self.pending.clear();
        let removed = self.entries.len();
        self.entries.clear();
        info!(removed, "Cleared subscription cache");
        removed
    }

    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let (mut live, mut expired) = (0, 0);
        for entry in self.entries.iter() {
            if entry.is_live(now) {
                live += 1;
            } else {
                expired += 1;
            }
        }

        CacheStats {
            total: live + expired,
            live,
            expired,
            max_entries: self.config.max_entries,
            ttl_secs: self.config.ttl.as_secs(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Unknown tenants and exempt tenants never reach the subscription query.
    async fn fetch(&self, tenant_id: &TenantId) -> StoreResult<SubscriptionDecision> {
        let tenant = self.store.find_tenant(tenant_id).await?;
        if !tenant.exists {
            return Ok(SubscriptionDecision::unknown_tenant());
        }
        if !tenant.check_required {
            return Ok(SubscriptionDecision::exempt());
        }

        let active = self.store.find_active_subscription(tenant_id).await?;
        Ok(SubscriptionDecision::enforced(active))
    }

    fn begin_lookup<'a>(&'a self, tenant_id: &'a TenantId) -> PendingLookup<'a> {
        let ticket = *self
            .pending
            .entry(tenant_id.clone())
            .or_insert_with(|| self.next_ticket.fetch_add(1, Ordering::Relaxed));
        PendingLookup {
            pending: &self.pending,
            tenant_id,
            ticket,
        }
    }

    fn live_entry(&self, tenant_id: &TenantId, now: Instant) -> Option<SubscriptionDecision> {
        let live = match self.entries.get(tenant_id) {
            Some(entry) => entry.is_live(now).then_some(entry.decision),
            None => return None,
        };
        if live.is_none() {
            self.entries.remove_if(tenant_id, |_, entry| !entry.is_live(now));
        }
        live
    }

    fn store_entry(&self, tenant_id: &TenantId, decision: SubscriptionDecision, ticket: u64) {
        let Some(expires_at) = Instant::now().checked_add(self.config.ttl) else {
            warn!(tenant_id = %tenant_id, ttl = ?self.config.ttl, "TTL overflows the clock, not caching");
            return;
        };

        if self.entries.len() >= self.config.max_entries && !self.entries.contains_key(tenant_id) {
            self.make_room();
        }

        // Lock order is entries then pending; nothing takes them the other way round.
        let slot = self.entries.entry(tenant_id.clone());
        let current = self
            .pending
            .remove_if(tenant_id, |_, registered| *registered == ticket)
            .is_some();
        if !current {
            debug!(tenant_id = %tenant_id, "Discarding lookup result, ticket no longer registered");
            return;
        }
        slot.insert(CacheEntry::new(decision, expires_at));
    }

    /// Sweep expired entries, then evict the soonest-expiring batch if the
    /// cache is still full.
    fn make_room(&self) {
        let now = Instant::now();
        self.sweep_expired(now);

        let len = self.entries.len();
        if len < self.config.max_entries {
            return;
        }

        let mut by_expiry: Vec<(TenantId, Instant)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.expires_at))
            .collect();
        by_expiry.sort_unstable_by_key(|(_, expires_at)| *expires_at);

        let mut evicted = 0u64;
        for (tenant_id, _) in by_expiry.into_iter().take(self.config.eviction_batch(len)) {
            if self.entries.remove(&tenant_id).is_some() {
                evicted += 1;
            }
        }
        self.evictions.fetch_add(evicted, Ordering::Relaxed);
        debug!(evicted, max_entries = self.config.max_entries, "Evicted subscription cache entries");
    }

    fn maybe_sweep(&self) {
        let probability = self.config.cleanup_probability;
        if probability > 0.0 && rand::random::<f64>() < probability {
            self.sweep_expired(Instant::now());
        }
    }

    fn sweep_expired(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "Swept expired subscription cache entries");
        }
        removed
    }
}

#[async_trait]
impl SubscriptionStatusSource for SubscriptionCache {
    async fn subscription_status(
        &self,
        tenant_id: &TenantId,
    ) -> SiteGateResult<SubscriptionDecision> {
        Ok(self.get_status(tenant_id).await)
    }
}

impl std::fmt::Debug for SubscriptionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionCache")
            .field("config", &self.config)
            .field("entries", &self.entries.len())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}
