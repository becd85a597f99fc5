use std::time::Duration;

/// Longest lifetime a stored decision may be given.
pub const MAX_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Configuration for the subscription cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// How long a stored decision is served. At most [`MAX_TTL`].
    pub ttl: Duration,
    /// Upper bound on stored entries.
    pub max_entries: usize,
    /// Share of entries evicted when the bound is reached (0.0 to 1.0).
    pub eviction_fraction: f64,
    /// Chance per lookup of sweeping expired entries (0.0 to 1.0).
    pub cleanup_probability: f64,
    /// Deadline for each access store round-trip.
    pub store_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(120),
            max_entries: 10_000,
            eviction_fraction: 0.10,
            cleanup_probability: 0.01,
            store_timeout: Duration::from_secs(5),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `SITEGATE_CACHE_TTL_SECS`: Entry lifetime (default: 120)
    /// - `SITEGATE_CACHE_MAX_ENTRIES`: Size bound (default: 10000)
    /// - `SITEGATE_CACHE_EVICTION_FRACTION`: Share evicted at the bound (default: 0.1)
    /// - `SITEGATE_CACHE_CLEANUP_PROBABILITY`: Sweep chance per lookup (default: 0.01)
    /// - `SITEGATE_STORE_TIMEOUT_MS`: Store round-trip deadline (default: 5000)
    ///
    /// Unparseable values fall back to the default; out-of-range values are
    /// clamped.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let ttl = std::env::var("SITEGATE_CACHE_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.ttl);

        let max_entries = std::env::var("SITEGATE_CACHE_MAX_ENTRIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_entries);

        let eviction_fraction = std::env::var("SITEGATE_CACHE_EVICTION_FRACTION")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.eviction_fraction);

        let cleanup_probability = std::env::var("SITEGATE_CACHE_CLEANUP_PROBABILITY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.cleanup_probability);

        let store_timeout = std::env::var("SITEGATE_STORE_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.store_timeout);

        Self::new()
            .with_ttl(ttl)
            .with_max_entries(max_entries)
            .with_eviction_fraction(eviction_fraction)
            .with_cleanup_probability(cleanup_probability)
            .with_store_timeout(store_timeout)
    }

    /// Set the entry lifetime, capped at [`MAX_TTL`].
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl.min(MAX_TTL);
        self
    }

    /// Set the size bound. Never below one.
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max.max(1);
        self
    }

    pub fn with_eviction_fraction(mut self, fraction: f64) -> Self {
        self.eviction_fraction = clamp_unit(fraction, self.eviction_fraction);
        self
    }

    pub fn with_cleanup_probability(mut self, probability: f64) -> Self {
        self.cleanup_probability = clamp_unit(probability, self.cleanup_probability);
        self
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Number of entries to evict from a cache holding `len` entries.
    ///
    /// Always at least one, so a full cache can always admit a new entry.
    pub fn eviction_batch(&self, len: usize) -> usize {
        let batch = (len as f64 * self.eviction_fraction).ceil() as usize;
        batch.clamp(1, len.max(1))
    }
}

fn clamp_unit(value: f64, fallback: f64) -> f64 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl, Duration::from_secs(120));
        assert_eq!(config.max_entries, 10_000);
        assert_eq!(config.store_timeout, Duration::from_secs(5));
        assert!((config.eviction_fraction - 0.10).abs() < f64::EPSILON);
        assert!((config.cleanup_probability - 0.01).abs() < f64::EPSILON);
    }

    #[test]
    fn test_builder_clamps() {
        let config = CacheConfig::new()
            .with_max_entries(0)
            .with_eviction_fraction(3.0)
            .with_cleanup_probability(-1.0);
        assert_eq!(config.max_entries, 1);
        assert!((config.eviction_fraction - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.cleanup_probability, 0.0);

        let nan = CacheConfig::new().with_eviction_fraction(f64::NAN);
        assert!((nan.eviction_fraction - 0.10).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ttl_is_capped() {
        let huge = CacheConfig::new().with_ttl(Duration::from_secs(u64::MAX));
        assert_eq!(huge.ttl, MAX_TTL);

        let short = CacheConfig::new().with_ttl(Duration::from_secs(30));
        assert_eq!(short.ttl, Duration::from_secs(30));
    }

    #[test]
    fn test_eviction_batch() {
        let config = CacheConfig::default();
        assert_eq!(config.eviction_batch(10_000), 1_000);
        assert_eq!(config.eviction_batch(5), 1);
        assert_eq!(config.eviction_batch(1), 1);

        let none = CacheConfig::new().with_eviction_fraction(0.0);
        assert_eq!(none.eviction_batch(100), 1);

        let all = CacheConfig::new().with_eviction_fraction(1.0);
        assert_eq!(all.eviction_batch(100), 100);
    }
}
