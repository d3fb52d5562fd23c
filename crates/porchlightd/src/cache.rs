//! Short-TTL cache in front of config resolution, keyed by site key.
//!
//! A plain map with a freshness check at read time. Racing readers may
//! each resolve; at-most-stale-by-TTL is the only guarantee. Failed
//! and empty resolutions are never cached, so probing with random keys
//! costs one resolver miss per key but cannot poison valid entries.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use porchlight_core::sdk::SdkConfig;

#[derive(Clone)]
pub struct SdkConfigCache {
    ttl: Duration,
    max_entries: usize,
    inner: Arc<DashMap<String, CachedConfig>>,
}

#[derive(Clone)]
struct CachedConfig {
    inserted_at: Instant,
    config: Arc<SdkConfig>,
}

impl SdkConfigCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries,
            inner: Arc::new(DashMap::new()),
        }
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    /// Return a fresh cached config, or run `resolve` and cache a
    /// successful find.
    pub fn fetch_with<E>(
        &self,
        site_key: &str,
        resolve: impl FnOnce() -> Result<Option<SdkConfig>, E>,
    ) -> Result<Option<Arc<SdkConfig>>, E> {
        if self.max_entries == 0 {
            return resolve().map(|opt| opt.map(Arc::new));
        }

        if let Some(entry) = self.inner.get(site_key) {
            if entry.inserted_at.elapsed() <= self.ttl {
                return Ok(Some(entry.config.clone()));
            }
        }

        let Some(config) = resolve()? else {
            return Ok(None);
        };
        let config = Arc::new(config);

        // Evict aggressively to avoid unbounded growth.
        if self.inner.len() >= self.max_entries {
            self.inner.clear();
        }

        self.inner.insert(
            site_key.to_string(),
            CachedConfig {
                inserted_at: Instant::now(),
                config: config.clone(),
            },
        );

        Ok(Some(config))
    }
}
