pub mod cache;
pub mod catalog_client;
pub mod config;
pub mod controllers;
pub mod dedup;
pub mod error;
pub mod geo;
pub mod ids;
pub mod middleware;
pub mod models;
pub mod persistence;
pub mod services;

use std::sync::Arc;

use anyhow::Context;
use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::cache::{CacheStore, RedisCache};
use crate::catalog_client::{EventSource, TicketmasterClient};
use crate::config::Config;
use crate::geo::GeoKeyBuilder;
use crate::persistence::{EventRepository, PgEventRepository};
use crate::services::{EventService, Recommender, WorkerPool};

// Shared state for the whole application
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub events: EventService,
    pub recommender: Recommender,
    pub pool: Arc<WorkerPool>,
}

impl AppState {
    /// Connects Postgres, Redis and the catalog client.
    pub async fn new(config: Config) -> anyhow::Result<Arc<Self>> {
        let repository = PgEventRepository::connect(&config.database.url, config.database.pool_size)
            .await
            .context("failed to connect to database")?;
        let cache = RedisCache::connect(&config.redis.url)
            .await
            .context("failed to connect to redis")?;
        let source = TicketmasterClient::from_config(&config.catalog)
            .context("failed to build catalog client")?;

        Self::from_parts(config, Arc::new(cache), Arc::new(source), Arc::new(repository))
    }

    /// Wires the services over arbitrary backends.
    pub fn from_parts(
        config: Config,
        cache: Arc<dyn CacheStore>,
        source: Arc<dyn EventSource>,
        repository: Arc<dyn EventRepository>,
    ) -> anyhow::Result<Arc<Self>> {
        let keys = GeoKeyBuilder::new(config.geo.precision, config.catalog.default_keyword.clone())?;
        let pool = Arc::new(WorkerPool::new(&config.executor)?);
        let events = EventService::new(cache, source, repository, keys, config.cache.ttl_seconds);
        let recommender = Recommender::new(events.clone(), Arc::clone(&pool));

        Ok(Arc::new(Self {
            config,
            events,
            recommender,
            pool,
        }))
    }
}

/// Full HTTP surface: probes at the root, the API under `/api`.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(|| async { "Nearby Events API" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", controllers::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
