use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use toolmux_protocol::{AvailableTool, ResolvedConfig, SearchMethod};

use crate::error::Result;
use crate::provider::{neutral_results, SearchProvider, SearchQuery, ToolMatch};
use crate::registry::ProviderRegistry;

const PROVIDER_CACHE_CAPACITY: usize = 32;
const NONE_DISABLED_REASON: &str = "Search disabled (method: NONE)";

/// Entry point for ranked retrieval under a resolved endpoint config.
///
/// Initialized providers are cached per `(method, provider config)` with a
/// small LRU; evicted and cleared providers are disposed, and disposal
/// failures are logged and swallowed.
pub struct SearchService {
    registry: ProviderRegistry,
    cache: Mutex<ProviderCache>,
}

impl SearchService {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self::with_capacity(registry, PROVIDER_CACHE_CAPACITY)
    }

    pub fn with_capacity(registry: ProviderRegistry, capacity: usize) -> Self {
        Self {
            registry,
            cache: Mutex::new(ProviderCache::new(capacity)),
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Rank `available` against `query` using the configured method.
    ///
    /// When the query carries no explicit cap, the resolved config's
    /// `max_results` applies. `NONE` short-circuits to a neutral listing
    /// without touching any provider.
    pub async fn search(
        &self,
        mut query: SearchQuery,
        available: &[AvailableTool],
        resolved: &ResolvedConfig,
    ) -> Result<Vec<ToolMatch>> {
        if query.max_results.is_none() {
            query.max_results = Some(resolved.max_results);
        }

        if resolved.search_method == SearchMethod::None {
            return Ok(neutral_results(
                available,
                query.limit(),
                NONE_DISABLED_REASON,
            ));
        }

        let provider = self
            .provider_for(resolved.search_method, resolved.provider_config.as_ref())
            .await?;
        provider.search(&query, available).await
    }

    /// Dispose and drop every cached provider.
    pub async fn clear(&self) {
        let entries = self.cache.lock().await.drain();
        for entry in entries {
            dispose_quietly(&entry).await;
        }
    }

    /// Dispose and drop cached providers of one method family.
    pub async fn clear_method(&self, method: SearchMethod) {
        let entries = self.cache.lock().await.drain_method(method);
        for entry in entries {
            dispose_quietly(&entry).await;
        }
    }

    pub async fn cached_provider_count(&self) -> usize {
        self.cache.lock().await.len()
    }

    async fn provider_for(
        &self,
        method: SearchMethod,
        config: Option<&Value>,
    ) -> Result<Arc<dyn SearchProvider>> {
        let key = cache_key(method, config);

        let mut cache = self.cache.lock().await;
        if let Some(provider) = cache.get(&key) {
            return Ok(provider);
        }

        let mut provider = self.registry.create(method, config)?;
        provider.initialize().await?;
        let provider: Arc<dyn SearchProvider> = Arc::from(provider);
        log::debug!("created {} provider for cache key {key}", provider.name());

        let evicted = cache.insert(key, method, provider.clone());
        drop(cache);
        for entry in evicted {
            dispose_quietly(&entry).await;
        }
        Ok(provider)
    }
}

impl Default for SearchService {
    fn default() -> Self {
        Self::new(ProviderRegistry::with_builtin_providers())
    }
}

async fn dispose_quietly(entry: &CacheEntry) {
    if let Err(err) = entry.provider.dispose().await {
        log::warn!("Failed to dispose {} provider: {err}", entry.provider.name());
    }
}

/// Provider cache key: method plus the canonical JSON of its config.
/// `serde_json` maps are BTree-backed, so serialization is key-sorted and
/// equal configs hash identically regardless of construction order.
fn cache_key(method: SearchMethod, config: Option<&Value>) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(method.as_str().as_bytes());
    hasher.update(b"|");
    if let Some(config) = config {
        hasher.update(serde_json::to_string(config).unwrap_or_default().as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

struct CacheEntry {
    method: SearchMethod,
    provider: Arc<dyn SearchProvider>,
}

struct ProviderCache {
    capacity: usize,
    entries: HashMap<String, CacheEntry>,
    order: VecDeque<String>,
}

impl ProviderCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.order.push_front(key.to_string());
    }

    fn get(&mut self, key: &str) -> Option<Arc<dyn SearchProvider>> {
        let provider = self.entries.get(key)?.provider.clone();
        self.touch(key);
        Some(provider)
    }

    /// Insert and return whatever fell off the end of the LRU order.
    fn insert(
        &mut self,
        key: String,
        method: SearchMethod,
        provider: Arc<dyn SearchProvider>,
    ) -> Vec<CacheEntry> {
        self.entries.insert(key.clone(), CacheEntry { method, provider });
        self.touch(&key);

        let mut evicted = Vec::new();
        while self.order.len() > self.capacity {
            if let Some(old) = self.order.pop_back() {
                if let Some(entry) = self.entries.remove(&old) {
                    evicted.push(entry);
                }
            }
        }
        evicted
    }

    fn drain(&mut self) -> Vec<CacheEntry> {
        self.order.clear();
        self.entries.drain().map(|(_, entry)| entry).collect()
    }

    fn drain_method(&mut self, method: SearchMethod) -> Vec<CacheEntry> {
        let keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.method == method)
            .map(|(key, _)| key.clone())
            .collect();

        let mut removed = Vec::new();
        for key in keys {
            if let Some(entry) = self.entries.remove(&key) {
                removed.push(entry);
            }
            if let Some(pos) = self.order.iter().position(|k| *k == key) {
                self.order.remove(pos);
            }
        }
        removed
    }
}
