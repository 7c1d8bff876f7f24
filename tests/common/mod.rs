#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use nearby_events::cache::{CacheStore, MemoryCache};
use nearby_events::catalog_client::EventSource;
use nearby_events::config::{
    AppConfig, CacheConfig, CatalogConfig, Config, DatabaseConfig, ExecutorConfig, GeoConfig,
    RedisConfig,
};
use nearby_events::models::RawCatalogResponse;
use nearby_events::persistence::{EventRepository, MemoryEventRepository};
use nearby_events::AppState;

pub const DEFAULT_KEYWORD: &str = "music";
pub const TTL_SECONDS: u64 = 3600;

pub fn test_config() -> Config {
    Config {
        app: AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            rust_log: "nearby_events=debug".to_string(),
            log_json: false,
        },
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            pool_size: 1,
        },
        redis: RedisConfig {
            url: "redis://unused".to_string(),
        },
        catalog: CatalogConfig {
            base_url: "http://unused".to_string(),
            api_key: "test-key".to_string(),
            default_keyword: DEFAULT_KEYWORD.to_string(),
            default_radius: 50,
            timeout_seconds: 5,
        },
        geo: GeoConfig { precision: 5 },
        cache: CacheConfig {
            ttl_seconds: TTL_SECONDS,
        },
        executor: ExecutorConfig::default(),
    }
}

/// `(id, name, distance, genre)` tuples rendered as a catalog page.
pub fn catalog_page(events: &[(&str, &str, f64, &str)]) -> RawCatalogResponse {
    let events: Vec<Value> = events
        .iter()
        .map(|(id, name, distance, genre)| {
            json!({
                "id": id,
                "name": name,
                "url": format!("https://tickets.example/{id}"),
                "distance": distance,
                "images": [{ "url": format!("https://img.example/{id}.jpg") }],
                "classifications": [{ "genre": { "name": genre } }],
                "_embedded": {
                    "venues": [{
                        "address": { "line1": "1 Main St" },
                        "city": { "name": "Springfield" },
                        "state": { "name": "IL" }
                    }]
                }
            })
        })
        .collect();
    serde_json::from_value(json!({ "_embedded": { "events": events } }))
        .expect("fixture page decodes")
}

#[derive(Clone)]
enum Reply {
    Page(RawCatalogResponse),
    Unavailable,
    Panic,
}

/// Catalog double that answers per keyword and counts calls.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    replies: Arc<Mutex<HashMap<String, Reply>>>,
    calls: Arc<AtomicUsize>,
    keywords: Arc<Mutex<Vec<Option<String>>>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page returned for `keyword`; `None` scripts the no-keyword request.
    pub fn reply(&self, keyword: Option<&str>, page: RawCatalogResponse) {
        self.set(keyword, Reply::Page(page));
    }

    pub fn unavailable(&self, keyword: Option<&str>) {
        self.set(keyword, Reply::Unavailable);
    }

    pub fn panic_on(&self, keyword: Option<&str>) {
        self.set(keyword, Reply::Panic);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn keywords(&self) -> Vec<Option<String>> {
        self.keywords.lock().unwrap().clone()
    }

    fn set(&self, keyword: Option<&str>, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .insert(keyword.unwrap_or_default().to_string(), reply);
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    async fn search(&self, _bucket: &str, keyword: Option<&str>) -> Option<RawCatalogResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.keywords.lock().unwrap().push(keyword.map(str::to_string));
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get(keyword.unwrap_or_default())
            .cloned();
        match reply {
            Some(Reply::Page(page)) => Some(page),
            Some(Reply::Panic) => panic!("catalog exploded"),
            Some(Reply::Unavailable) | None => None,
        }
    }
}

pub struct Harness {
    pub state: Arc<AppState>,
    pub cache: MemoryCache,
    pub source: ScriptedSource,
    pub repository: MemoryEventRepository,
}

impl Harness {
    pub fn new() -> Self {
        let cache = MemoryCache::new();
        let source = ScriptedSource::new();
        let repository = MemoryEventRepository::new();
        let state = AppState::from_parts(
            test_config(),
            Arc::new(cache.clone()) as Arc<dyn CacheStore>,
            Arc::new(source.clone()) as Arc<dyn EventSource>,
            Arc::new(repository.clone()) as Arc<dyn EventRepository>,
        )
        .expect("state builds");
        Self {
            state,
            cache,
            source,
            repository,
        }
    }
}
