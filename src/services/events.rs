//! Cache-aside search over the event catalog, plus user favorites.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::CacheStore;
use crate::catalog_client::EventSource;
use crate::error::AppError;
use crate::geo::{Coordinate, GeoKeyBuilder};
use crate::models::{normalize_response, CategoryRef, EventRecord, NormalizedEvent, RawCatalogResponse};
use crate::persistence::EventRepository;

#[derive(Clone)]
pub struct EventService {
    cache: Arc<dyn CacheStore>,
    source: Arc<dyn EventSource>,
    repository: Arc<dyn EventRepository>,
    keys: GeoKeyBuilder,
    cache_ttl_seconds: u64,
}

impl EventService {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        source: Arc<dyn EventSource>,
        repository: Arc<dyn EventRepository>,
        keys: GeoKeyBuilder,
        cache_ttl_seconds: u64,
    ) -> Self {
        Self {
            cache,
            source,
            repository,
            keys,
            cache_ttl_seconds,
        }
    }

    pub fn keys(&self) -> &GeoKeyBuilder {
        &self.keys
    }

    pub fn repository(&self) -> &Arc<dyn EventRepository> {
        &self.repository
    }

    /// Events near `coordinate`, served from the cache when the bucket is warm.
    ///
    /// Never fails: cache, catalog and storage problems are logged and degrade
    /// to a cache miss, an empty result, or a skipped write respectively.
    /// Only fresh catalog data is persisted; cache hits have no side effects.
    /// The write is awaited before returning, so a slow database adds to the
    /// latency of a miss, but a failed write never fails the search.
    pub async fn search(
        &self,
        coordinate: Coordinate,
        keyword: Option<&str>,
        user_id: &str,
    ) -> Vec<NormalizedEvent> {
        let bucket = self.keys.bucket(coordinate);
        let key = self.keys.cache_key(&bucket, keyword);
        let favorites: HashSet<String> = self.favorite_ids(user_id).await.into_iter().collect();

        if let Some(cached) = self.read_cache(&key).await {
            debug!(%key, "cache hit");
            return normalize_response(&cached, &favorites);
        }

        debug!(%key, "cache miss, querying catalog");
        let Some(response) = self.source.search(&bucket, keyword).await else {
            return Vec::new();
        };

        self.write_cache(&key, &response).await;
        let events = normalize_response(&response, &favorites);
        self.persist(&events).await;
        events
    }

    /// Favorite ids of a user, oldest first; storage errors read as no favorites.
    pub async fn favorite_ids(&self, user_id: &str) -> Vec<String> {
        match self.repository.find_favorite_event_ids(user_id).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(user_id, error = %e, "failed to load favorites");
                Vec::new()
            }
        }
    }

    pub async fn set_favorite(&self, user_id: &str, event_id: &str) -> Result<(), AppError> {
        self.require_user(user_id).await?;
        self.require_event(event_id).await?;
        self.repository.add_favorite(user_id, event_id).await?;
        info!(user_id, event_id, "favorite added");
        Ok(())
    }

    pub async fn unset_favorite(&self, user_id: &str, event_id: &str) -> Result<(), AppError> {
        self.require_user(user_id).await?;
        self.require_event(event_id).await?;
        self.repository.remove_favorite(user_id, event_id).await?;
        info!(user_id, event_id, "favorite removed");
        Ok(())
    }

    pub async fn favorite_events(&self, user_id: &str) -> Result<Vec<NormalizedEvent>, AppError> {
        self.require_user(user_id).await?;
        let mut events = Vec::new();
        for id in self.repository.find_favorite_event_ids(user_id).await? {
            if let Some(mut event) = self.repository.find_event_by_id(&id).await? {
                event.favorite = true;
                events.push(event);
            }
        }
        Ok(events)
    }

    async fn require_user(&self, user_id: &str) -> Result<(), AppError> {
        match self.repository.find_user_by_id(user_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::user_not_found(user_id)),
        }
    }

    async fn require_event(&self, event_id: &str) -> Result<(), AppError> {
        match self.repository.find_event_by_id(event_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::event_not_found(event_id)),
        }
    }

    async fn read_cache(&self, key: &str) -> Option<RawCatalogResponse> {
        let bytes = match self.cache.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(%key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(response) => Some(response),
            Err(e) => {
                warn!(%key, error = %e, "malformed cache entry, treating as miss");
                None
            }
        }
    }

    async fn write_cache(&self, key: &str, response: &RawCatalogResponse) {
        let bytes = match serde_json::to_vec(response) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(%key, error = %e, "failed to serialize catalog response");
                return;
            }
        };
        if let Err(e) = self.cache.set(key, &bytes, self.cache_ttl_seconds).await {
            warn!(%key, error = %e, "cache write failed");
        }
    }

    /// Writes a page of events, resolving each distinct category name once.
    async fn persist(&self, events: &[NormalizedEvent]) {
        if events.is_empty() {
            return;
        }

        let mut resolved: HashMap<String, CategoryRef> = HashMap::new();
        for name in events.iter().flat_map(|event| event.categories.iter()) {
            let folded = name.to_lowercase();
            if resolved.contains_key(&folded) {
                continue;
            }
            match self.repository.upsert_category(name).await {
                Ok(category) => {
                    resolved.insert(folded, category);
                }
                Err(e) => {
                    warn!(category = %name, error = %e, "failed to store category, skipping batch");
                    return;
                }
            }
        }

        let batch: Vec<EventRecord> = events
            .iter()
            .map(|event| {
                let mut categories: Vec<CategoryRef> = event
                    .categories
                    .iter()
                    .filter_map(|name| resolved.get(&name.to_lowercase()).cloned())
                    .collect();
                categories.sort_by_key(|category| category.id);
                categories.dedup_by_key(|category| category.id);
                EventRecord {
                    event: event.clone(),
                    categories,
                }
            })
            .collect();

        match self.repository.upsert_events(&batch).await {
            Ok(()) => debug!(events = batch.len(), categories = resolved.len(), "events persisted"),
            Err(e) => warn!(events = batch.len(), error = %e, "failed to persist events"),
        }
    }
}
