use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::{fallback_config, normalize, ConfigSource, ServiceConfig};
use crate::store::ConfigStore;

/// In-memory cache of resolved service configurations, keyed
/// `"{company}:{service}"`.
///
/// Lookups never fail: a store error or missing record degrades to the
/// compiled-in fallback configuration, so pricing is always computable.
/// Concurrent misses for the same key may issue duplicate loads; the last
/// writer wins, which is harmless because loads are idempotent.
pub struct ConfigCache {
    store: Arc<dyn ConfigStore>,
    entries: DashMap<String, Arc<ServiceConfig>>,
}

impl ConfigCache {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            store,
            entries: DashMap::new(),
        }
    }

    fn key(company_id: &str, service_name: &str) -> String {
        format!("{company_id}:{service_name}")
    }

    /// Cache-or-load. Cached entries are returned with
    /// [`ConfigSource::Cached`] provenance.
    pub async fn get(&self, company_id: &str, service_name: &str) -> Arc<ServiceConfig> {
        let key = Self::key(company_id, service_name);

        if let Some(entry) = self.entries.get(&key) {
            crate::metrics::record_cache_lookup(service_name, "hit");
            debug!(company_id, service_name, "Config cache hit");
            let mut config = (**entry).clone();
            config.source = ConfigSource::Cached;
            return Arc::new(config);
        }

        crate::metrics::record_cache_lookup(service_name, "miss");
        let config = self.load(company_id, service_name).await;
        // Fallback results are not cached: the next call should retry the
        // store instead of pinning degraded defaults
        if config.source == ConfigSource::Live {
            self.entries.insert(key, config.clone());
        }
        config
    }

    /// Bypass the cache, refresh the entry. Used when the caller needs
    /// guaranteed freshness, e.g. right after editing the configuration.
    pub async fn force_reload(&self, company_id: &str, service_name: &str) -> Arc<ServiceConfig> {
        crate::metrics::record_cache_lookup(service_name, "force_reload");
        let key = Self::key(company_id, service_name);
        let config = self.load(company_id, service_name).await;
        if config.source == ConfigSource::Live {
            self.entries.insert(key, config.clone());
        } else {
            // The record is gone or the store is down; stop serving the old
            // cached value
            self.entries.remove(&key);
        }
        config
    }

    pub fn invalidate(&self, company_id: &str, service_name: &str) {
        if self
            .entries
            .remove(&Self::key(company_id, service_name))
            .is_some()
        {
            debug!(company_id, service_name, "Config cache entry invalidated");
        }
    }

    pub fn invalidate_all(&self) {
        let count = self.entries.len();
        self.entries.clear();
        debug!(entries = count, "Config cache cleared");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Live fetch with graceful degradation to the fallback configuration.
    async fn load(&self, company_id: &str, service_name: &str) -> Arc<ServiceConfig> {
        match self.store.fetch(company_id, service_name).await {
            Ok(Some(record)) => {
                debug!(company_id, service_name, "Loaded config from store");
                Arc::new(normalize(
                    company_id,
                    service_name,
                    record,
                    ConfigSource::Live,
                ))
            }
            Ok(None) => {
                warn!(
                    company_id,
                    service_name, "No config record found, using fallback defaults"
                );
                crate::metrics::record_config_fallback(service_name, "missing");
                Arc::new(fallback_config(company_id, service_name))
            }
            Err(e) => {
                warn!(
                    company_id,
                    service_name,
                    error = %e,
                    "Config store lookup failed, using fallback defaults"
                );
                crate::metrics::record_config_fallback(service_name, "store_error");
                Arc::new(fallback_config(company_id, service_name))
            }
        }
    }
}
