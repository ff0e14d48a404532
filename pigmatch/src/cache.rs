//! TTL cache for property search results.
//!
//! Keyed by the normalized filter plus a generation counter. Any property write bumps the
//! generation before clearing the cache, so a listing read before the write can only be stored
//! under a generation no reader asks for. A cached listing is at most `ttl` old and never
//! outlives a change made through this process.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::config::ListingsCacheConfig;
use crate::db::models::properties::{Property, PropertyFilter};

#[derive(Clone)]
pub struct ListingCache {
    /// `None` when caching is disabled (zero TTL)
    inner: Option<Cache<String, Arc<Vec<Property>>>>,
    generation: Arc<AtomicU64>,
}

impl ListingCache {
    pub fn new(config: &ListingsCacheConfig) -> Self {
        Self::with_ttl(config.ttl, config.max_capacity)
    }

    pub fn with_ttl(ttl: Duration, max_capacity: u64) -> Self {
        let inner = (!ttl.is_zero()).then(|| Cache::builder().max_capacity(max_capacity).time_to_live(ttl).build());
        Self {
            inner,
            generation: Arc::default(),
        }
    }

    pub fn disabled() -> Self {
        Self {
            inner: None,
            generation: Arc::default(),
        }
    }

    /// Take this before reading storage and hand it back to [`ListingCache::insert`].
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub async fn get(&self, filter: &PropertyFilter) -> Option<Arc<Vec<Property>>> {
        let cache = self.inner.as_ref()?;
        cache.get(&Self::key(self.generation(), filter)).await
    }

    /// Store a listing read at `generation`. Stale after any later write, so never served.
    pub async fn insert(&self, filter: &PropertyFilter, generation: u64, properties: Arc<Vec<Property>>) {
        if let Some(cache) = &self.inner {
            cache.insert(Self::key(generation, filter), properties).await;
        }
    }

    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        if let Some(cache) = &self.inner {
            cache.invalidate_all();
        }
    }

    fn key(generation: u64, filter: &PropertyFilter) -> String {
        format!("{generation}:{}", filter.cache_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;
    use chrono::Utc;
    use uuid::Uuid;

    fn listing() -> Arc<Vec<Property>> {
        Arc::new(vec![Property {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "Upcountry".to_string(),
            location: GeoPoint { lat: 20.8, lng: -156.3 },
            notes: None,
            island: Some("Maui".to_string()),
            max_hunters: None,
            size_acres: None,
            daily_rate: None,
            created_at: Utc::now(),
        }])
    }

    #[tokio::test]
    async fn test_hit_and_invalidate() {
        let cache = ListingCache::with_ttl(Duration::from_secs(60), 10);
        let filter = PropertyFilter {
            island: Some("Maui".to_string()),
            ..Default::default()
        };
        assert!(cache.get(&filter).await.is_none());

        cache.insert(&filter, cache.generation(), listing()).await;
        assert_eq!(cache.get(&filter).await.map(|l| l.len()), Some(1));
        // Island matching is case-insensitive, so is the key
        let shouted = PropertyFilter {
            island: Some("MAUI".to_string()),
            ..Default::default()
        };
        assert!(cache.get(&shouted).await.is_some());
        assert!(cache.get(&PropertyFilter::default()).await.is_none());

        cache.invalidate_all();
        assert!(cache.get(&filter).await.is_none());
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_cache() {
        let cache = ListingCache::with_ttl(Duration::ZERO, 10);
        let filter = PropertyFilter::default();
        cache.insert(&filter, cache.generation(), listing()).await;
        assert!(cache.get(&filter).await.is_none());
    }

    #[tokio::test]
    async fn test_listing_read_before_a_write_is_never_served() {
        let cache = ListingCache::with_ttl(Duration::from_secs(60), 10);
        let filter = PropertyFilter::default();

        // Reader takes the generation and loads storage, then a write lands before it caches
        let generation = cache.generation();
        let before_write = listing();
        cache.invalidate_all();
        cache.insert(&filter, generation, before_write).await;
        assert!(cache.get(&filter).await.is_none());

        let after_write = listing();
        cache.insert(&filter, cache.generation(), after_write.clone()).await;
        let served = cache.get(&filter).await.unwrap();
        assert_eq!(served[0].id, after_write[0].id);
    }
}
